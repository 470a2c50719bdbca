use std::str::FromStr;

use syn::visit::Visit;

use super::*;

fn manifest_dir() -> PathBuf {
    PathBuf::from(env::var_os("CARGO_MANIFEST_DIR").unwrap())
}

#[derive(Default)]
struct Consts(Vec<(String, String)>);
impl<'ast> Visit<'ast> for Consts {
    fn visit_item_const(&mut self, i: &'ast syn::ItemConst) {
        let expr = &i.expr;
        self.0
            .push((i.ident.to_string(), quote!(#expr).to_string()));
    }
}

fn consts(tokens: TokenStream) -> Vec<(String, String)> {
    let ast: syn::File = syn::parse2(tokens).unwrap();
    let mut vis = Consts::default();
    vis.visit_file(&ast);
    vis.0
}

#[test]
fn test_get_config_filename() {
    let dir = manifest_dir();
    let input = TokenStream::from_str("").unwrap();
    assert_eq!(get_config_filename(input).unwrap(), dir.join("keymap.conf"));

    let input = quote! {
        "keymaps/miryo.conf"
    };
    assert_eq!(
        get_config_filename(input).unwrap(),
        dir.join("keymaps/miryo.conf")
    );

    let input = quote! {
        "/test.conf"
    };
    assert_eq!(
        get_config_filename(input).unwrap(),
        PathBuf::from("/test.conf")
    );

    let input = quote! { 123 };
    assert_eq!(
        get_config_filename(input).unwrap_err().to_string(),
        "Expected filename or nothing as argument"
    );
}

#[test]
fn quote_conf_with_invalid_config() {
    let filename = manifest_dir().join("test/invalid-layout.conf");
    let res = quote_conf(&filename).err().unwrap().to_string();

    assert!(res.starts_with("error: Invalid global 'foo'"), "{}", res);
    assert!(
        res.contains("splitmap-macros/test/invalid-layout.conf:3:1\n"),
        "{}",
        res
    );
    assert!(res.trim().ends_with("3 | foo = 123"), "{}", res);
}

#[test]
fn quote_conf_missing_file() {
    let filename = manifest_dir().join("test/no-such.conf");
    let res = quote_conf(&filename).err().unwrap().to_string();
    assert!(res.starts_with("Can't read conf file "), "{}", res);
}

#[test]
fn configure_keymap_reports_compile_error() {
    let res = configure_keymap(quote! { "test/invalid-layout.conf" }).to_string();
    assert!(res.starts_with("compile_error !"), "{}", res);
}

#[test]
fn quote_conf_with_valid_config() {
    let filename = manifest_dir().join("test/keymap.conf");
    let consts = consts(quote_conf(&filename).unwrap());

    let names: Vec<_> = consts.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(
        names,
        [
            "LAYOUT_MAPPING",
            "ROW_COUNT",
            "COL_COUNT",
            "LAYOUT_MAX",
            "REPORT_BUFFER_SIZE",
            "KEYBOARD_NAME",
            "LAYER_NAMES",
            "_",
            "_",
        ]
    );

    let value = |name: &str| {
        consts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .unwrap()
    };
    assert_eq!(value("ROW_COUNT"), "2usize");
    assert_eq!(value("COL_COUNT"), "3usize");
    assert_eq!(value("LAYOUT_MAX"), "2 * 1024");
    assert_eq!(value("REPORT_BUFFER_SIZE"), "32usize");
    assert_eq!(value("KEYBOARD_NAME"), "\"test board\"");
    assert!(
        value("LAYER_NAMES").ends_with("new (& [\"Base\" , \"nav\"])"),
        "{}",
        value("LAYER_NAMES")
    );
}

#[test]
fn layout_mapping_matches_compiler() {
    let filename = manifest_dir().join("test/keymap.conf");
    let source = fs::read_to_string(&filename).unwrap();
    let bin = compile(&source).unwrap().serialize();

    let res = quote_conf(&filename).unwrap().to_string();
    let expected = format!("[u16 ; {}]", bin.len());
    assert!(res.contains(&expected), "{}", res);
}

#[test]
fn defaults_without_firmware_section() {
    let config = compile("[matrix:1x1]\n0x00 = a\n[main]\na = b\n").unwrap();
    let consts = consts(keymap_consts(&config, Path::new("/keymaps/tiny.conf")).unwrap());
    let value = |name: &str| {
        consts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .unwrap()
    };
    assert_eq!(value("LAYOUT_MAX"), "256usize");
    assert_eq!(value("KEYBOARD_NAME"), "\"tiny\"");
}

#[test]
fn layout_max_rounds_up() {
    assert_eq!(default_layout_max(10), 256);
    assert_eq!(default_layout_max(256), 256);
    assert_eq!(default_layout_max(257), 512);
}
