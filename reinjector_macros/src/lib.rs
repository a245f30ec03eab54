use proc_macro::TokenStream;
use proc_macro2::Literal;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{parse_macro_input, Ident, LitInt, LitStr, Token, Type};

// NOTE:
// This proc-macro crate must depend on proc-macro2, quote and syn, and in
// Cargo.toml:
//   [lib]
//   proc-macro = true

// ============================================================
// define_env_constant!
// ============================================================

/// define_env_constant!(PKT_QUEUE_SIZE: usize, env = "REINJECTOR_PKT_QUEUE_SIZE", default = 256, min = 2);
///
/// Reads the *build-time* environment variable while the proc-macro runs.
/// - If missing, unparsable, or below `min`, falls back to `default`.
/// - `min` is optional and defaults to 1.
///
/// Expands to:
/// - `pub const <NAME>: <ty> = <resolved>;`
struct EnvConstArgs {
    name: Ident,
    ty: Type,
    env_name: String,
    default: u64,
    min: u64,
}

fn expect_key(input: ParseStream<'_>, key: &str) -> syn::Result<()> {
    let k: Ident = input.parse()?;
    if k != key {
        return Err(syn::Error::new_spanned(k, format!("expected `{key}`")));
    }
    input.parse::<Token![=]>()?;
    Ok(())
}

impl Parse for EnvConstArgs {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        // NAME: ty
        let name: Ident = input.parse()?;
        input.parse::<Token![:]>()?;
        let ty: Type = input.parse()?;
        input.parse::<Token![,]>()?;

        // env = "..."
        expect_key(input, "env")?;
        let env_lit: LitStr = input.parse()?;
        input.parse::<Token![,]>()?;

        // default = N
        expect_key(input, "default")?;
        let default_lit: LitInt = input.parse()?;
        let default = default_lit.base10_parse::<u64>()?;

        // optional: , min = N
        let mut min = 1u64;
        if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
            if !input.is_empty() {
                expect_key(input, "min")?;
                let min_lit: LitInt = input.parse()?;
                min = min_lit.base10_parse::<u64>()?;
            }
        }

        if default < min {
            return Err(syn::Error::new_spanned(
                default_lit,
                format!("default {default} is below the minimum {min}"),
            ));
        }

        Ok(Self {
            name,
            ty,
            env_name: env_lit.value(),
            default,
            min,
        })
    }
}

fn read_from_env(env_key: &str, default: u64, min: u64) -> u64 {
    match std::env::var(env_key) {
        Ok(v) => match v.trim().parse::<u64>() {
            Ok(n) if n >= min => n,
            _ => default, // invalid or too small -> default
        },
        Err(_) => default, // missing -> default
    }
}

#[proc_macro]
pub fn define_env_constant(input: TokenStream) -> TokenStream {
    let EnvConstArgs {
        name,
        ty,
        env_name,
        default,
        min,
    } = parse_macro_input!(input as EnvConstArgs);

    let value = read_from_env(&env_name, default, min);
    let lit = Literal::u64_unsuffixed(value);
    let doc = format!(
        " Resolved at compile time from `{env_name}` (default {default}, minimum {min})."
    );

    let expanded = quote! {
        #[doc = #doc]
        pub const #name: #ty = #lit;
    };

    expanded.into()
}
