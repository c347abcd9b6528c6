//! `#[timeout]` / `#[timeout(N)]`: runs a synchronous test body on a worker
//! thread and fails the test if it has not finished within N seconds.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, ItemFn, LitInt};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[proc_macro_attribute]
pub fn timeout(attr: TokenStream, item: TokenStream) -> TokenStream {
    let secs = if attr.is_empty() {
        DEFAULT_TIMEOUT_SECS
    } else {
        let lit = parse_macro_input!(attr as LitInt);
        match lit.base10_parse::<u64>() {
            Ok(0) => {
                return syn::Error::new_spanned(lit, "timeout must be greater than zero")
                    .to_compile_error()
                    .into();
            }
            Ok(value) => value,
            Err(err) => return err.to_compile_error().into(),
        }
    };

    let function = parse_macro_input!(item as ItemFn);
    match expand(secs, function) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(secs: u64, function: ItemFn) -> syn::Result<TokenStream2> {
    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = function;

    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "#[timeout] expects a synchronous test function",
        ));
    }

    let attrs: Vec<Attribute> = attrs.into_iter().filter(|a| !is_plain_test(a)).collect();
    let name = sig.ident.to_string();

    Ok(quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            let limit = ::std::time::Duration::from_secs(#secs);
            let (done_tx, done_rx) = ::std::sync::mpsc::channel();
            let worker = ::std::thread::Builder::new()
                .name(::std::string::String::from(#name))
                .spawn(move || {
                    let outcome = ::std::panic::catch_unwind(
                        ::std::panic::AssertUnwindSafe(|| #block),
                    );
                    let _ = done_tx.send(outcome);
                })
                .expect("spawn test worker");
            match done_rx.recv_timeout(limit) {
                Ok(Ok(_)) => {
                    let _ = worker.join();
                }
                Ok(Err(payload)) => ::std::panic::resume_unwind(payload),
                Err(::std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    panic!("{} exceeded {}s", #name, #secs)
                }
                Err(::std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    panic!("{} worker exited without reporting", #name)
                }
            }
        }
    })
}

fn is_plain_test(attr: &Attribute) -> bool {
    attr.path().is_ident("test")
}
