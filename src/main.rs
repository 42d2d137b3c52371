use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::env;
use std::fs::{self, File};
use tracing::{info, warn};

// Use library instead of local modules
use freelancer_kit::{
    amount_to_words, delete_document, export_documents_csv, format_amount, format_phone,
    format_tax_id, generate, get_stats, list_documents, load_profile, parse_amount,
    printable_page, record_generated, reload_snapshot, save_profile, setup_database,
    Contract, DocumentKind, GeneratedDocument, KitError, PricingInput, Profile, Proposal,
    Receipt, Settings,
};

fn main() -> Result<()> {
    let settings = Settings::load()?;
    settings.init_logging()?;

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");
    let rest: &[String] = args.get(2..).unwrap_or(&[]);

    match command {
        "format" => println!("{}", format_amount(&rest.join(" "))),
        "parse" => println!("{:.2}", parse_amount(&rest.join(" "))),
        "tax-id" => println!("{}", format_tax_id(&rest.join(" "))),
        "phone" => println!("{}", format_phone(&rest.join(" "))),
        "words" => run_words(&rest.join(" "))?,
        "price" => run_price(rest)?,
        "profile" => run_profile(&settings, rest)?,
        "generate" => run_generate(&settings, rest)?,
        "history" => run_history(&settings, rest)?,
        "show" => run_show(&settings, rest)?,
        "delete" => run_delete(&settings, rest)?,
        "export" => run_export(&settings, rest)?,
        "stats" => run_stats(&settings)?,
        _ => print_usage(),
    }

    Ok(())
}

fn print_usage() {
    println!("freelancer-kit {}", freelancer_kit::VERSION);
    println!();
    println!("Masks:");
    println!("  format <digits>                 currency mask        (123450 -> R$ 1.234,50)");
    println!("  parse <masked>                  masked amount -> number");
    println!("  tax-id <digits>                 CPF / CNPJ mask");
    println!("  phone <digits>                  phone mask");
    println!("  words <masked>                  amount written out   (R$ 1.000,00 -> um mil reais)");
    println!();
    println!("Tools:");
    println!("  price key=value...              rent internet software other salary hours margin taxes");
    println!("  profile [key=value...]          show or update your profile");
    println!("  generate <proposta|contrato|recibo> key=value...");
    println!("  history [proposta|contrato|recibo]");
    println!("  show <id>                       saved form data of a document");
    println!("  delete <id>");
    println!("  export <file.csv>");
    println!("  stats");
}

fn open_db(settings: &Settings) -> Result<Connection> {
    let conn = Connection::open(&settings.db_path)
        .with_context(|| format!("Failed to open database {:?}", settings.db_path))?;
    setup_database(&conn)?;
    Ok(conn)
}

/// `key=value` arguments into a map
fn parse_pairs(args: &[String]) -> Result<HashMap<String, String>> {
    let mut pairs = HashMap::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("Expected key=value, got: {}", arg);
        };
        pairs.insert(key.trim().to_string(), value.to_string());
    }
    Ok(pairs)
}

/// Plain number field (hours, percentages); blank or invalid reads as 0
fn plain_number(value: &str) -> f64 {
    value.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0)
}

fn run_words(input: &str) -> Result<()> {
    let amount = parse_amount(input);
    println!("{}", amount_to_words(amount)?);
    Ok(())
}

fn run_price(args: &[String]) -> Result<()> {
    let mut input = PricingInput::default();

    for (key, value) in parse_pairs(args)? {
        match key.as_str() {
            "rent" => input.rent = parse_amount(&value),
            "internet" => input.internet = parse_amount(&value),
            "software" => input.software = parse_amount(&value),
            "other" => input.other_costs = parse_amount(&value),
            "salary" => input.desired_salary = parse_amount(&value),
            "hours" => input.hours_per_month = plain_number(&value),
            "margin" => input.margin_percent = plain_number(&value),
            "taxes" => input.tax_percent = plain_number(&value),
            other => bail!("Unknown pricing field: {}", other),
        }
    }

    let quote = input.quote();
    println!("💰 Valor por hora: {}", quote.hourly_amount());
    println!("   Valor por dia:  {}", quote.daily_amount());
    println!("   Valor por mês:  {}", quote.monthly_amount());
    Ok(())
}

fn run_profile(settings: &Settings, args: &[String]) -> Result<()> {
    let conn = open_db(settings)?;
    let mut profile = load_profile(&conn, &settings.user_id)?.unwrap_or_default();

    if args.is_empty() {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    for (key, value) in parse_pairs(args)? {
        match key.as_str() {
            "name" => profile.name = value,
            "email" => profile.email = value,
            "cpf_cnpj" => profile.cpf_cnpj = format_tax_id(&value),
            "phone" => profile.phone = format_phone(&value),
            "address" => profile.address = value,
            "profession" => profile.profession = value,
            "company" => profile.company = value,
            "bio" => profile.bio = value,
            other => bail!("Unknown profile field: {}", other),
        }
    }

    save_profile(&conn, &settings.user_id, &profile)?;
    println!("✓ Perfil salvo com sucesso!");
    Ok(())
}

/// Build a form from `key=value` pairs. Amounts go through the currency
/// parser and tax ids / phones through their masks, as the form fields do.
fn form_from_pairs<T: DeserializeOwned>(pairs: HashMap<String, String>) -> Result<T> {
    let mut fields = serde_json::Map::new();

    for (key, value) in pairs {
        let json = match key.as_str() {
            "value" => serde_json::json!(parse_amount(&value)),
            "number" => serde_json::json!(value.trim().parse::<u32>().context("Invalid receipt number")?),
            "client_tax_id" | "payer_tax_id" => serde_json::json!(format_tax_id(&value)),
            "client_phone" => serde_json::json!(format_phone(&value)),
            _ => serde_json::Value::String(value),
        };
        fields.insert(key, json);
    }

    serde_json::from_value(serde_json::Value::Object(fields)).context("Invalid document fields")
}

fn run_generate(settings: &Settings, args: &[String]) -> Result<()> {
    let Some((kind_arg, field_args)) = args.split_first() else {
        bail!("Usage: generate <proposta|contrato|recibo> key=value...");
    };
    let kind: DocumentKind = kind_arg.parse()?;
    let pairs = parse_pairs(field_args)?;

    let conn = open_db(settings)?;
    let profile = match load_profile(&conn, &settings.user_id)? {
        Some(profile) => profile,
        None => {
            warn!(user_id = %settings.user_id, "no profile saved, documents will use placeholders");
            Profile::default()
        }
    };

    let now = Utc::now();
    let doc: GeneratedDocument = match kind {
        DocumentKind::Proposta => generate(&form_from_pairs::<Proposal>(pairs)?, &profile, now)?,
        DocumentKind::Contrato => generate(&form_from_pairs::<Contract>(pairs)?, &profile, now)?,
        DocumentKind::Recibo => generate(&form_from_pairs::<Receipt>(pairs)?, &profile, now)?,
    };

    fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("Failed to create {:?}", settings.output_dir))?;
    let path = settings.output_dir.join(&doc.filename);
    fs::write(&path, printable_page(&doc.filename, &doc.html))
        .with_context(|| format!("Failed to write {:?}", path))?;
    info!(path = %path.display(), "printable page written");

    let (count, record) = record_generated(&conn, &settings.user_id, &doc, now)?;

    println!("📄 {} gerado: {}", kind.name(), path.display());
    println!("   Abra no navegador e use \"Salvar como PDF\" na janela de impressão.");
    println!("✓ Salvo no histórico ({}) - total de {}: {}", record.id, kind.stat_key(), count);
    Ok(())
}

fn run_history(settings: &Settings, args: &[String]) -> Result<()> {
    let filter = match args.first().map(String::as_str) {
        None | Some("todos") => None,
        Some(kind) => Some(kind.parse::<DocumentKind>()?),
    };

    let conn = open_db(settings)?;
    let documents = list_documents(&conn, &settings.user_id, filter)?;

    if documents.is_empty() {
        println!("Nenhum documento encontrado.");
        return Ok(());
    }

    for doc in &documents {
        println!(
            "{}  {:<9} {:<40} {:<30} {:>16}  {}",
            doc.created_at_formatted,
            doc.kind.code(),
            doc.title,
            doc.description,
            doc.value,
            doc.id
        );
    }
    println!("\n{} documento(s)", documents.len());
    Ok(())
}

fn run_show(settings: &Settings, args: &[String]) -> Result<()> {
    let Some(id) = args.first() else {
        bail!("Usage: show <id>");
    };

    let conn = open_db(settings)?;
    match reload_snapshot(&conn, &settings.user_id, id) {
        Ok(editable) => {
            println!("Tipo: {}", editable.kind);
            println!("Valor: {}", editable.masked_value);
            println!("{}", serde_json::to_string_pretty(&editable.full_data)?);
            Ok(())
        }
        Err(e) if matches!(e.downcast_ref::<KitError>(), Some(KitError::MissingSnapshot(_))) => {
            println!("Este documento não possui dados salvos para edição (documento antigo).");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn run_delete(settings: &Settings, args: &[String]) -> Result<()> {
    let Some(id) = args.first() else {
        bail!("Usage: delete <id>");
    };

    let conn = open_db(settings)?;
    delete_document(&conn, &settings.user_id, id)?;
    println!("✓ Documento excluído");
    Ok(())
}

fn run_export(settings: &Settings, args: &[String]) -> Result<()> {
    let Some(path) = args.first() else {
        bail!("Usage: export <file.csv>");
    };

    let conn = open_db(settings)?;
    let file = File::create(path).with_context(|| format!("Failed to create {}", path))?;
    let rows = export_documents_csv(&conn, &settings.user_id, file)?;
    println!("✓ Exported {} documents to {}", rows, path);
    Ok(())
}

fn run_stats(settings: &Settings) -> Result<()> {
    let conn = open_db(settings)?;
    let stats = get_stats(&conn, &settings.user_id)?;

    println!("📊 Documentos gerados");
    for kind in DocumentKind::ALL {
        println!("   {:<10} {}", kind.stat_key(), stats.get(kind));
    }
    println!("   {:<10} {}", "total", stats.total());
    Ok(())
}
