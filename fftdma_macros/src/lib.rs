// This file is part of fftdma, a diagnostic that drives an FFT accelerator through a DMA engine.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// fftdma is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// fftdma is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Procedural macros for fftdma.
//!
//! The only macro provided is [`macro@platform`], which attaches a
//! `register_platform()` associated function to a platform type so that it can be
//! added to the platform registry at startup.

use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, LitStr, parse_macro_input};

/// Register a struct as an fftdma platform under a compatibility string.
///
/// The struct must provide a `new()` constructor returning `Self` and implement the
/// `Platform` trait.
///
/// ```rust,ignore
/// #[platform(compat_string = "simulated")]
/// pub struct SimulatedPlatform { /* ... */ }
///
/// SimulatedPlatform::register_platform();
/// ```
#[proc_macro_attribute]
pub fn platform(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut compat_string: Option<LitStr> = None;
    let attr_parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("compat_string") {
            compat_string = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported platform property, expected `compat_string`"))
        }
    });
    parse_macro_input!(attr with attr_parser);

    let item = parse_macro_input!(item as ItemStruct);
    let Some(compat_string) = compat_string else {
        return syn::Error::new_spanned(
            &item.ident,
            "#[platform] requires `compat_string = \"...\"`",
        )
        .to_compile_error()
        .into();
    };

    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();

    quote! {
        #item

        impl #impl_generics #name #ty_generics #where_clause {
            /// Compatibility string this platform is registered under.
            pub const COMPAT_STRING: &'static str = #compat_string;

            /// Add this platform to the global platform registry.
            pub fn register_platform() {
                crate::platforms::platform::register_platform(#compat_string, || {
                    ::std::boxed::Box::new(#name::new())
                });
            }
        }
    }
    .into()
}
