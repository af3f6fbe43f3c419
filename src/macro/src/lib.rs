// Copyright 2026 The Voxdag Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use proc_macro::TokenStream;
use quote::quote;
use syn::spanned::Spanned;
use syn::{ItemFn, LitInt};

/// Run an async test body on a fresh `voxdag_runtime::ExecutorOwner`.
///
/// ```ignore
/// #[voxdag_macro::test(workers = 4)]
/// async fn concurrent_writes() {}
/// ```
#[proc_macro_attribute]
pub fn test(args: TokenStream, item: TokenStream) -> TokenStream {
    let mut workers: usize = 1;
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("workers") {
            let lit: LitInt = meta.value()?.parse()?;
            workers = lit.base10_parse()?;
            if workers == 0 {
                return Err(meta.error("at least one worker is required"));
            }
            Ok(())
        } else {
            Err(meta.error("unsupported test attribute, expect `workers = N`"))
        }
    });
    syn::parse_macro_input!(args with parser);

    let mut input = syn::parse_macro_input!(item as ItemFn);
    if input.sig.asyncness.is_none() {
        return syn::Error::new(input.sig.span(), "async fn is required").to_compile_error().into();
    }
    input.sig.asyncness = None;
    let body = input.block;
    input.block = syn::parse_quote! {
        {
            voxdag_runtime::ExecutorOwner::new(#workers)
                .executor()
                .block_on(async move { #body });
        }
    };

    quote! {
        #[::core::prelude::v1::test]
        #input
    }
    .into()
}
