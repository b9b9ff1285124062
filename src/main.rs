use std::env;
use std::path::{Path, PathBuf};

use log::error;
use subp_tool::subp::dictionary::DEFAULT_DICTIONARY_PATH;
use subp_tool::{pack_file, unpack_file, ConvertOptions, HashDictionary, Language};

const USAGE: &str = "\
Usage:
  subp-tool <file.subp|file.xml>... [-<language>] [-Dictionary <path>] [-OutputHashes]

  file.subp           Unpacks the subtitle pack to file.xml
  file.xml            Packs the document to file.subp

Options:
  -<language>         Text encoding: -ara, -eng, -fre, -ger, -ita, -jpn, -por, -rus, -spa
  -Dictionary, -d     Word list used to resolve hashes (default: subp_dictionary.txt)
  -OutputHashes, -o   Writes all entry hashes to <file>_subpIdHashes.txt";

struct Args {
    paths: Vec<PathBuf>,
    options: ConvertOptions,
    dictionary_path: PathBuf,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut paths = Vec::new();
    let mut options = ConvertOptions::default();
    let mut dictionary_path = PathBuf::from(DEFAULT_DICTIONARY_PATH);
    let mut language: Option<Language> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let lower = arg.to_ascii_lowercase();
        match lower.as_str() {
            "-outputhashes" | "-o" => options.output_hashes = true,
            "-dictionary" | "-d" => {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("{} requires a file path", arg))?;
                dictionary_path = PathBuf::from(value);
            }
            _ if arg.starts_with('-') => {
                let selected = Language::from_selector(arg)
                    .ok_or_else(|| format!("Unknown option {}", arg))?;
                if language.is_some() {
                    return Err("Can only define one encoding".to_string());
                }
                language = Some(selected);
            }
            _ => paths.push(PathBuf::from(arg)),
        }
    }

    if paths.is_empty() {
        return Err("No input file given".to_string());
    }
    options.encoding = language.map(subp_tool::subp::codec::text::encoding_for_language);

    Ok(Args {
        paths,
        options,
        dictionary_path,
    })
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("ERROR: {}\n\n{}", message, USAGE);
            std::process::exit(1);
        }
    };

    // Built lazily: packing never needs it.
    let mut dictionary: Option<HashDictionary> = None;
    let mut failures = 0;

    for path in &args.paths {
        let result = if has_extension(path, "subp") {
            let dictionary =
                dictionary.get_or_insert_with(|| HashDictionary::build(&args.dictionary_path));
            unpack_file(path, &args.options, dictionary)
        } else if has_extension(path, "xml") {
            pack_file(path, &args.options)
        } else {
            eprintln!("Skipping {}: expected a .subp or .xml file", path.display());
            failures += 1;
            continue;
        };

        match result {
            Ok(output) => println!(
                "{} -> {} ({} entries)",
                path.display(),
                output.path.display(),
                output.entries
            ),
            Err(e) => {
                error!("Failed to convert {}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        std::process::exit(1);
    }
}
