use std::io::Read as _;
use wikitext_cst::{
    config::{CONFIG, CONFIG_SOURCE},
    wikitext::{Configuration, FileMap, Parser, to_wikitext},
};

fn usage<T>(err: &'static str) -> anyhow::Result<T> {
    let exe = std::env::args().next().unwrap_or_default();
    println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("Usage: {exe} [options] [FILE]\n");
    println!("Reads Wikitext from FILE, or from standard input if no file is given.\n");
    println!("Options:");
    println!("    --json: Print the syntax tree as JSON");
    println!("    --check: Verify that the syntax tree reproduces the input");
    println!("    --tags <a,b>: Additional parser extension tag names");
    println!("    --config <file.json>: Configuration overrides\n");
    Err(anyhow::Error::msg(err))
}

fn read_input(path: Option<String>) -> anyhow::Result<String> {
    Ok(if let Some(path) = path {
        std::fs::read_to_string(path)?
    } else {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        source
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        return usage("Help requested");
    }
    let json = args.contains("--json");
    let check = args.contains("--check");
    let tags = args.opt_value_from_str::<_, String>("--tags")?;
    let config_path = args.opt_value_from_str::<_, String>("--config")?;
    let _ = args.contains("--");
    let path = args.opt_free_from_str::<String>()?;

    if !args.finish().is_empty() {
        return usage("Unknown extra arguments passed");
    }

    let mut config = if let Some(config_path) = config_path {
        Configuration::from_json(&CONFIG_SOURCE, &std::fs::read_to_string(config_path)?)?
    } else {
        CONFIG.clone()
    };
    if let Some(tags) = tags {
        config = config.with_extension_tags(
            tags.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty()),
        )?;
    }

    let source = read_input(path)?;
    let output = Parser::new(&config).parse(&source);

    if json {
        println!("{}", serde_json::to_string_pretty(&output.root)?);
    } else {
        println!("{:#?}", output.root);
    }

    log::info!(
        "{} memoised failures, {} reused, {} refused for depth",
        output.stats.failures,
        output.stats.failure_hits,
        output.stats.depth_refusals
    );

    if check {
        let serialized = to_wikitext(&output.root);
        if serialized != source {
            let offset = serialized
                .char_indices()
                .zip(source.char_indices())
                .find(|((_, a), (_, b))| a != b)
                .map_or(serialized.len().min(source.len()), |((offset, _), _)| offset);
            let location = FileMap::new(&source).find_line_col(offset);
            anyhow::bail!("serialized tree differs from input at {location}");
        }
        eprintln!("ok: serialized tree matches input");
    }

    Ok(())
}
