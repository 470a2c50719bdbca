use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use splitmap_config::{compiler::KeyboardConfig, keycodes, pretty_compile};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    process,
};

/// Compile and inspect splitmap keymaps
#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a keymap compiles
    Validate(FileArgs),
    /// List the layers of a keymap with their display names
    Layers(FileArgs),
    /// Print the keys of every layer of a keymap
    Dump(DumpArgs),
    /// List the known key names
    Keycodes(KeycodesArgs),
}

#[derive(Args)]
struct FileArgs {
    /// keymap description file
    file: PathBuf,
}

#[derive(Args)]
struct KeycodesArgs {
    /// only list names containing this text (case insensitive)
    pattern: Option<String>,
}

#[derive(Args)]
struct DumpArgs {
    /// keymap description file
    file: PathBuf,
    /// Print the compiled binary layout instead
    #[clap(long, short)]
    binary: bool,
}

fn read_source(file: &Path) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("Failed to read \"{}\"", file.display()))
}

fn compile_file<'s>(file: &Path, src: &'s str) -> Result<KeyboardConfig<'s>> {
    pretty_compile(file, src).map_err(|err| {
        if err.span.is_none() {
            anyhow!("{}", err)
        } else {
            anyhow!("Failed to compile \"{}\"", file.display())
        }
    })
}

fn validate(args: &FileArgs) -> Result<()> {
    let src = read_source(&args.file)?;
    let config = compile_file(&args.file, &src)?;
    log::info!(
        "{}: {} layers, {} macros",
        args.file.display(),
        config.layer_count(),
        config.macro_count()
    );
    Ok(())
}

fn layers(args: &FileArgs, out: &mut impl Write) -> Result<()> {
    let src = read_source(&args.file)?;
    let config = compile_file(&args.file, &src)?;
    let tri = config.tri_layer();
    for (i, (name, display)) in config
        .layer_names()
        .into_iter()
        .zip(config.display_names())
        .enumerate()
    {
        let note = match tri {
            Some((a, b, r)) if r as usize == i => format!("  (when {a} and {b})"),
            _ => String::new(),
        };
        writeln!(out, "{i:>2} {name:<12} {display}{note}")?;
    }
    Ok(())
}

fn dump(args: &DumpArgs, out: &mut impl Write) -> Result<()> {
    let src = read_source(&args.file)?;
    let config = compile_file(&args.file, &src)?;
    if args.binary {
        for chunk in config.serialize().chunks(8) {
            let line = chunk
                .iter()
                .map(|w| format!("{w:04x}"))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{line}")?;
        }
        return Ok(());
    }

    for name in config.layer_names() {
        writeln!(out, "[{name}]")?;
        for row in 0..config.row_count as u16 {
            let keys = (0..config.col_count as u16)
                .map(|col| keycodes::describe_code(config.code_at(name, (row << 8) | col)))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(out, "{row}: {keys}")?;
        }
    }
    for (i, cw, ccw) in config.encoders() {
        writeln!(
            out,
            "encoder {i}: {} {}",
            keycodes::describe_code(cw),
            keycodes::describe_code(ccw)
        )?;
    }
    Ok(())
}

fn list_keycodes(args: &KeycodesArgs, out: &mut impl Write) -> Result<()> {
    let pattern = args.pattern.as_deref().unwrap_or_default().to_lowercase();
    for desc in keycodes::keycodes_iter().filter(|d| d.name.to_lowercase().contains(&pattern)) {
        writeln!(out, "{:#06x} {}", desc.code, desc.name)?;
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        eprintln!("{:#}", err);
        process::exit(1);
    };
}

fn run(cli: &Cli) -> Result<()> {
    let mut out = std::io::stdout().lock();
    match &cli.command {
        Commands::Validate(args) => validate(args),
        Commands::Layers(args) => layers(args, &mut out),
        Commands::Dump(args) => dump(args, &mut out),
        Commands::Keycodes(args) => list_keycodes(args, &mut out),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn keymap(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../keyboards/kyria/keymaps")
            .join(name)
    }

    #[test]
    fn validate_cmd() {
        for name in ["miryo.conf", "callum.conf", "kajih.conf"] {
            let args = FileArgs {
                file: keymap(name),
            };
            validate(&args).expect("to be valid");
        }
    }

    #[test]
    fn validate_missing_file() {
        let args = FileArgs {
            file: PathBuf::from("/no/such/keymap.conf"),
        };
        let err = validate(&args).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
    }

    #[test]
    fn validate_bad_keymap() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("bad.conf");
        fs::write(&file, "[matrix:1x1]\n0x00 = a\n[base]\na = nosuch\n").unwrap();
        let err = validate(&FileArgs { file }).unwrap_err();
        assert!(err.to_string().starts_with("Failed to compile"));
    }

    #[test]
    fn layers_cmd() {
        let mut out = Vec::new();
        layers(
            &FileArgs {
                file: keymap("kajih.conf"),
            },
            &mut out,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].ends_with("QWERTY"), "{}", lines[0]);
        assert!(lines[6].contains("Tri-State  (when 2 and 3)"), "{}", lines[6]);
    }

    #[test]
    fn dump_cmd() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("small.conf");
        fs::write(
            &file,
            "[matrix:1x2]\n0x00 = a b\n[base]\na = q\nb = layer(nav)\n[nav]\n",
        )
        .unwrap();

        let mut out = Vec::new();
        dump(
            &DumpArgs {
                file: file.clone(),
                binary: false,
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[base]\n0: Q layer(1)\n[nav]\n0: Transparent Transparent\n"
        );

        let mut out = Vec::new();
        dump(&DumpArgs { file, binary: true }, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("0001 0102 0002"));
    }

    #[test]
    fn keycodes_cmd() {
        let mut out = Vec::new();
        list_keycodes(&KeycodesArgs { pattern: None }, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("0x0004 A\n"));
        assert!(text.contains("0x2001 caps_word\n"));

        let mut out = Vec::new();
        list_keycodes(
            &KeycodesArgs {
                pattern: Some("RGB_HUE".into()),
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0x0503 rgb_hue_up\n0x0504 rgb_hue_down\n"
        );
    }
}
