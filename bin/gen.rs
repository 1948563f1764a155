use clap::{Arg, Command};
use std::io::{self, Write};

const NAMES: &[&str] = &["Ana", "Bruno", "Carla", "Diego", "Élida", "Fábio", "Graça", "Hugo"];
const STAGES: &[&str] = &["novo", "contatado", "reuniao", "proposta", "fechado", "perdido"];
const TEMPERATURES: &[&str] = &["frio", "morno", "quente"];

fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Generate a synthetic lead CSV on stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(Arg::new("delim").long("delim").default_value(","))
        .arg(
            Arg::new("encoding")
                .long("encoding")
                .value_parser(["utf8", "utf8-bom", "latin1", "utf16le"])
                .default_value("utf8"),
        )
        .arg(
            Arg::new("invalid_every")
                .long("invalid-every")
                .help("Break every Nth row (bad email, phone or stage)")
                .value_parser(clap::value_parser!(u64)),
        )
        .get_matches();

    let rows: u64 = *matches.get_one("rows").unwrap();
    let delim = matches.get_one::<String>("delim").unwrap();
    let encoding = matches.get_one::<String>("encoding").unwrap();
    let invalid_every = matches.get_one::<u64>("invalid_every").copied();

    let mut text = String::new();
    text.push_str(
        &["Nome", "Email", "Telefone", "Empresa", "Valor", "Etapa", "Temperatura"].join(delim.as_str()),
    );
    text.push_str("\r\n");

    for i in 0..rows {
        let broken = invalid_every.is_some_and(|n| n > 0 && (i + 1) % n == 0);
        let name = NAMES[i as usize % NAMES.len()];
        let email = if broken && i % 3 == 0 {
            format!("lead{i}-sem-arroba")
        } else {
            format!("lead{i}@exemplo.com.br")
        };
        let phone = if broken && i % 3 == 1 {
            "123".to_string()
        } else {
            format!("119{:08}", i % 100_000_000)
        };
        let stage = if broken && i % 3 == 2 {
            "ganho"
        } else {
            STAGES[i as usize % STAGES.len()]
        };
        // decimal comma forces quoting unless the delimiter is not a comma
        let value = format!("{},{:02}", 1000 + i, i % 100);
        let value = if delim == "," {
            format!("\"{value}\"")
        } else {
            value
        };

        let fields = [
            format!("{name} {i}"),
            email,
            phone,
            format!("Empresa {}", i % 50),
            value,
            stage.to_string(),
            TEMPERATURES[i as usize % TEMPERATURES.len()].to_string(),
        ];
        text.push_str(&fields.join(delim.as_str()));
        text.push_str("\r\n");
    }

    let bytes: Vec<u8> = match encoding.as_str() {
        "utf8-bom" => [&[0xEF, 0xBB, 0xBF][..], text.as_bytes()].concat(),
        "latin1" => {
            let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode(&text);
            encoded.into_owned()
        }
        "utf16le" => {
            let mut out = vec![0xFF, 0xFE];
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
            out
        }
        _ => text.into_bytes(),
    };

    let mut out = io::BufWriter::new(io::stdout().lock());
    out.write_all(&bytes)?;
    out.flush()?;
    Ok(())
}
