//! Punto de entrada ("driver").
//!
//! Este módulo orquesta las diferentes fases del proceso de
//! compilación y expone una CLI.

use anyhow::{self, bail, Context};
use clap::{self, crate_version, Arg, Command};
use exprc::{
    error::Diagnostics,
    interp,
    lex::Lexer,
    link::{LinkOptions, Linker, Platform},
    parse::{self, Expr},
    target,
};

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
};

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Parsing de CLI
    let args = Command::new("Arithmetic expression compiler")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .default_value("-")
                .help("Source file ('-' for stdin)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .default_value("a.out")
                .help("Output file ('-' along with -S for stdout)"),
        )
        .arg(
            Arg::new("asm")
                .short('S')
                .help("Generate assembly instead of linking"),
        )
        .arg(Arg::new("strip").short('s').help("Strip executables"))
        .arg(
            Arg::new("eval")
                .short('e')
                .long("eval")
                .help("Evaluate the expression instead of compiling it"),
        )
        .arg(
            Arg::new("system")
                .long("system")
                .takes_value(true)
                .value_name("NAME")
                .help("Target operating system (defaults to host)"),
        )
        .arg(
            Arg::new("machine")
                .short('a')
                .long("machine")
                .takes_value(true)
                .value_name("NAME")
                .help("Target machine (defaults to host)"),
        )
        .arg(
            Arg::new("registers")
                .short('r')
                .long("registers")
                .takes_value(true)
                .value_name("LIST")
                .help("Comma-separated register pool override"),
        )
        .get_matches();

    // Se extraen argumentos necesarios
    let input = args.value_of("input").unwrap_or("-");
    let output = args.value_of("output").unwrap_or("a.out");
    let asm = args.is_present("asm");

    let expr = frontend(input)?;

    if args.is_present("eval") {
        let value = interp::evaluate(&expr).context("Failed to evaluate expression")?;
        println!("{}", value);

        return Ok(());
    }

    let platform = match (args.value_of("system"), args.value_of("machine")) {
        (None, None) => Platform::host()?,
        (system, machine) => Platform::detect(
            system.unwrap_or(std::env::consts::OS),
            machine.unwrap_or(std::env::consts::ARCH),
        )?,
    };

    let registers: Option<Vec<String>> = args.value_of("registers").map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect()
    });

    let listing = target::emit(&expr, platform.arch(), registers.as_deref())
        .context("Code generation failed")?;

    match (asm, output) {
        // Salida a stdout sin enlazado
        (true, "-") => {
            let stdout = io::stdout();
            let mut stdout = stdout.lock();

            listing
                .write_to(&mut stdout)
                .and_then(|()| stdout.flush())
                .context("Failed to emit to stdout")?;
        }

        // Salida a archivo sin enlazado
        (true, path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            listing
                .write_to(&mut file)
                .with_context(|| format!("Failed to emit to file: {}", path))?;
        }

        // Salida a stdout con enlazado
        (false, "-") => bail!("Refusing to write executable to stdout"),

        // Salida a archivo con enlazado
        (false, path) => {
            let mut options = LinkOptions::empty();
            if args.is_present("strip") {
                options |= LinkOptions::STRIP;
            }

            let mut linker = Linker::spawn(platform, &path, options).context("Failed to link")?;
            listing
                .write_to(linker.stdin())
                .context("Failed to emit assembly to assembler")?;

            linker
                .finish()
                .with_context(|| format!("Failed to generate executable: {}", path))?;
        }
    };

    Ok(())
}

/// Lee y analiza la expresión de entrada.
///
/// Los errores de sintaxis se reportan como diagnósticos y terminan
/// el proceso.
fn frontend(input: &str) -> anyhow::Result<Expr> {
    let (reader, name): (Box<dyn BufRead>, _) = match input {
        "-" => (Box::new(io::stdin().lock()), "<stdin>"),
        path => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open for reading: {}", path))?;

            (Box::new(BufReader::new(file)), path)
        }
    };

    match parse::parse(Lexer::new(reader, name)) {
        Ok(expr) => Ok(expr),
        Err(error) => {
            eprint!("{}", Diagnostics::from(error));
            std::process::exit(1);
        }
    }
}

/// Habilita trazas a stderr solo cuando `RUST_LOG` está definido.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env())
        .init();
}
