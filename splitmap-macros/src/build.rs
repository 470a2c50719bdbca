use proc_macro2::TokenStream;
use quote::quote;
use regex::{Captures, Regex};
use splitmap_config::{
    compiler::{compile, KeyboardConfig},
    ConfigError,
};
use std::{
    borrow::Cow,
    env,
    fmt::Display,
    fs,
    path::{Path, PathBuf},
};
use syn::Lit;

const DEFAULT_REPORT_BUFFER_SIZE: usize = 32;
const MIN_LAYOUT_MAX: usize = 256;

/// A message that ends up in `compile_error!`.
#[derive(Debug)]
struct BuildError(String);
impl Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
impl std::error::Error for BuildError {}
impl<E: std::error::Error> From<&E> for BuildError {
    fn from(err: &E) -> Self {
        Self(err.to_string())
    }
}

type Result<T> = std::result::Result<T, BuildError>;

pub(crate) fn configure_keymap(input: TokenStream) -> TokenStream {
    match get_config_filename(input).and_then(|file| quote_conf(&file)) {
        Ok(tokens) => tokens,
        Err(BuildError(message)) => quote! { compile_error!(#message); },
    }
}

/// The keymap file named by the macro argument, or `keymap.conf`, relative to the crate.
fn get_config_filename(input: TokenStream) -> Result<PathBuf> {
    let dir = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| BuildError("CARGO_MANIFEST_DIR not found".into()))?;
    if input.is_empty() {
        return Ok(dir.join("keymap.conf"));
    }
    match syn::parse2::<syn::Expr>(input).map_err(|e| BuildError::from(&e))? {
        syn::Expr::Lit(syn::ExprLit {
            lit: Lit::Str(name),
            ..
        }) => Ok(dir.join(name.value())),
        _ => Err(BuildError(
            "Expected filename or nothing as argument".into(),
        )),
    }
}

fn quote_conf(source_file: &Path) -> Result<TokenStream> {
    let source = fs::read_to_string(source_file).map_err(|e| {
        BuildError(format!(
            "Can't read conf file {}, {e:?}",
            source_file.display()
        ))
    })?;
    let config = compile(&source)
        .map_err(|e: ConfigError| BuildError(e.long_format(source_file, &source)))?;

    let defs = keymap_consts(&config, source_file)?;
    let source_file = source_file.display().to_string();

    Ok(quote! {
        #defs

        const _: &[u8] = include_bytes!(#source_file);
        const _: () = assert!(
            LAYOUT_MAPPING.len() <= LAYOUT_MAX,
            "keymap does not fit in max_layout_size"
        );
    })
}

/// Firmware values may refer to other firmware values by name, e.g.
/// `max_layout_size = layout_kb * 1024`.
fn firmware_var<'c>(config: &'c KeyboardConfig, vre: &Regex, name: &str) -> Option<Cow<'c, str>> {
    let v = config.firmware_get(name)?;
    Some(vre.replace_all(v, |caps: &Captures| {
        if let Some(v) = config.firmware_get(&caps[1]) {
            v.to_owned()
        } else {
            caps[0].to_owned()
        }
    }))
}

fn parse_tokens(name: &str, value: &str) -> Result<TokenStream> {
    value
        .replace('#', "//")
        .parse::<TokenStream>()
        .map_err(|e| BuildError(format!("Error parsing {name}: {e}")))
}

fn default_layout_max(len: usize) -> usize {
    ((len + 255) & !255).max(MIN_LAYOUT_MAX)
}

fn keyboard_name(config: &KeyboardConfig, source_file: &Path) -> String {
    match config.firmware_get("keyboard") {
        Some(name) => name.trim_matches('"').to_owned(),
        None => source_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

fn keymap_consts(config: &KeyboardConfig, source_file: &Path) -> Result<TokenStream> {
    let vre = Regex::new(r"([a-zA-Z_]+)").map_err(|e| BuildError::from(&e))?;

    let bin = config.serialize();
    let layout_mapping = format!("{{ const M: [u16; {}] = {:?}; &M }}", bin.len(), bin)
        .parse::<TokenStream>()
        .map_err(|e| BuildError::from(&e))?;

    macro_rules! parse_or {
        ($f:tt, $default:expr) => {
            let $f = match firmware_var(config, &vre, stringify!($f)) {
                Some(v) => parse_tokens(stringify!($f), &v)?,
                None => {
                    let d: usize = $default;
                    quote! { #d }
                }
            };
        };
    }

    parse_or!(max_layout_size, default_layout_max(bin.len()));
    parse_or!(report_buffer_size, DEFAULT_REPORT_BUFFER_SIZE);

    let row_count = config.row_count as usize;
    let col_count = config.col_count as usize;
    let keyboard = keyboard_name(config, source_file);
    let names = config.display_names();

    Ok(quote! {
        const LAYOUT_MAPPING: &[u16] = #layout_mapping;
        const ROW_COUNT: usize = #row_count;
        const COL_COUNT: usize = #col_count;
        const LAYOUT_MAX: usize = #max_layout_size;
        const REPORT_BUFFER_SIZE: usize = #report_buffer_size;
        const KEYBOARD_NAME: &str = #keyboard;
        const LAYER_NAMES: splitmap_firmware::layer::LayerNames<'static> =
            splitmap_firmware::layer::LayerNames::new(&[#(#names),*]);
    })
}

#[cfg(test)]
#[path = "build_test.rs"]
mod test;
