// 📄 Documents - proposals, service contracts and payment receipts
//
// Each form snapshot renders to an HTML fragment that embeds the masked amount
// (and for contracts/receipts the written-out amount). The snapshot itself is
// kept as JSON next to the history record so the form can be reopened later.

use crate::error::KitError;
use crate::money::Amount;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DATE_FORMAT: &str = "%d/%m/%Y";
const EMPTY_DATE: &str = "___/___/______";
const CONTRACT_TITLE_CHARS: usize = 50;

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Proposta,
    Contrato,
    Recibo,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Proposta,
        DocumentKind::Contrato,
        DocumentKind::Recibo,
    ];

    /// Key used in storage and on the wire
    pub fn code(&self) -> &str {
        match self {
            DocumentKind::Proposta => "proposta",
            DocumentKind::Contrato => "contrato",
            DocumentKind::Recibo => "recibo",
        }
    }

    /// Name of the per-user counter bumped when one is generated
    pub fn stat_key(&self) -> &str {
        match self {
            DocumentKind::Proposta => "propostas",
            DocumentKind::Contrato => "contratos",
            DocumentKind::Recibo => "recibos",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DocumentKind::Proposta => "Proposta Comercial",
            DocumentKind::Contrato => "Contrato de Prestação de Serviços",
            DocumentKind::Recibo => "Recibo",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for DocumentKind {
    type Err = KitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "proposta" | "propostas" => Ok(DocumentKind::Proposta),
            "contrato" | "contratos" => Ok(DocumentKind::Contrato),
            "recibo" | "recibos" => Ok(DocumentKind::Recibo),
            other => Err(KitError::UnknownDocumentKind(other.to_string())),
        }
    }
}

/// The freelancer issuing the documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub name: String,
    pub email: String,
    pub cpf_cnpj: String,
    pub phone: String,
    pub address: String,
    pub profession: String,
    pub company: String,
    pub bio: String,
}

/// Everything produced by one "generate" action
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDocument {
    pub kind: DocumentKind,
    pub title: String,
    pub description: String,
    pub value: Amount,
    pub filename: String,
    pub html: String,
    pub full_data: serde_json::Value,
}

// ============================================================================
// TEMPLATE TRAIT
// ============================================================================

/// A document form that can be rendered and recorded in the history
pub trait DocumentTemplate: Serialize {
    fn kind(&self) -> DocumentKind;

    fn value(&self) -> Amount;

    /// Fill empty fields with the fallbacks printed on the document
    fn apply_defaults(&mut self);

    /// Title shown in the history list
    fn title(&self) -> String;

    /// One-line description shown in the history list
    fn description(&self) -> String;

    /// Suggested file name for the printable page
    fn filename(&self, generated_at: DateTime<Utc>) -> String;

    fn render_html(&self, profile: &Profile, today: NaiveDate) -> Result<String>;
}

/// Normalize a form, render it and bundle everything the history needs
pub fn generate<T: DocumentTemplate + Clone>(
    form: &T,
    profile: &Profile,
    generated_at: DateTime<Utc>,
) -> Result<GeneratedDocument> {
    let mut form = form.clone();
    form.apply_defaults();

    let html = form.render_html(profile, generated_at.date_naive())?;
    let full_data = serde_json::to_value(&form).context("Failed to serialize form snapshot")?;

    Ok(GeneratedDocument {
        kind: form.kind(),
        title: form.title(),
        description: form.description(),
        value: form.value(),
        filename: form.filename(generated_at),
        html,
        full_data,
    })
}

// ============================================================================
// PROPOSAL
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Proposal {
    pub client_name: String,
    pub client_email: String,
    pub client_company: String,
    pub client_phone: String,
    pub title: String,
    pub description: String,
    pub value: Amount,
    pub deadline: String,
    pub payment_terms: String,
    pub validity: String,
}

impl DocumentTemplate for Proposal {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Proposta
    }

    fn value(&self) -> Amount {
        self.value
    }

    fn apply_defaults(&mut self) {
        fill(&mut self.client_name, "Cliente");
        fill(&mut self.title, "Projeto");
        fill(&mut self.validity, "7 dias");
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn description(&self) -> String {
        format!("Cliente: {}", self.client_name)
    }

    fn filename(&self, generated_at: DateTime<Utc>) -> String {
        format!(
            "Proposta_{}_{}.html",
            underscored(&self.client_name),
            generated_at.timestamp_millis()
        )
    }

    fn render_html(&self, profile: &Profile, today: NaiveDate) -> Result<String> {
        let issuer = first_filled(&[&profile.company, &profile.name], "FreelancerKit Pro");
        let signer = first_filled(&[&profile.name], "Prestador de Serviços");
        let company_line = if self.client_company.is_empty() {
            String::new()
        } else {
            format!("<p>{}</p>", escape_html(&self.client_company))
        };

        Ok(format!(
            r#"<div class="document proposta">
    <header>
        <h1>PROPOSTA COMERCIAL</h1>
        <p>{today}</p>
        <p><strong>{issuer}</strong></p>
        <p>{profession}</p>
    </header>
    <section>
        <h3>Para:</h3>
        <p><strong>{client}</strong></p>
        {company_line}
        <p>{email}</p>
    </section>
    <section>
        <h2>{title}</h2>
        <p style="white-space: pre-line;">{description}</p>
    </section>
    <section>
        <p>Valor do Investimento</p>
        <p class="amount">{value}</p>
        <p>Prazo de Entrega</p>
        <p>{deadline}</p>
    </section>
    <section>
        <h3>Condições de Pagamento</h3>
        <p>{payment}</p>
    </section>
    <p><strong>Validade da proposta:</strong> {validity}</p>
    <footer>
        <div class="signature"><p>{signer}</p><p>{signer_id}</p></div>
        <div class="signature"><p>{client}</p><p>Contratante</p></div>
    </footer>
</div>"#,
            today = today.format(DATE_FORMAT),
            issuer = escape_html(issuer),
            profession = escape_html(&profile.profession),
            client = escape_html(&self.client_name),
            company_line = company_line,
            email = escape_html(&self.client_email),
            title = escape_html(&self.title),
            description = escape_html(&self.description),
            value = self.value,
            deadline = escape_html(&self.deadline),
            payment = escape_html(&self.payment_terms),
            validity = escape_html(&self.validity),
            signer = escape_html(signer),
            signer_id = escape_html(&profile.cpf_cnpj),
        ))
    }
}

// ============================================================================
// CONTRACT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contract {
    pub client_name: String,
    pub client_tax_id: String,
    pub client_address: String,
    pub object: String,
    pub value: Amount,
    pub payment_terms: String,
    /// `YYYY-MM-DD`
    pub start_date: String,
    /// `YYYY-MM-DD`
    pub end_date: String,
}

impl DocumentTemplate for Contract {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Contrato
    }

    fn value(&self) -> Amount {
        self.value
    }

    fn apply_defaults(&mut self) {
        fill(&mut self.client_name, "Contratante");
    }

    fn title(&self) -> String {
        let head: String = self.object.chars().take(CONTRACT_TITLE_CHARS).collect();
        format!("{}...", head)
    }

    fn description(&self) -> String {
        format!("Contratante: {}", self.client_name)
    }

    fn filename(&self, generated_at: DateTime<Utc>) -> String {
        format!(
            "Contrato_{}_{}.html",
            underscored(&self.client_name),
            generated_at.timestamp_millis()
        )
    }

    fn render_html(&self, profile: &Profile, today: NaiveDate) -> Result<String> {
        let contractor = first_filled(&[&profile.name], "Prestador de Serviços");
        let blank = "_______________";
        let words = self.value.to_words()?;

        Ok(format!(
            r#"<div class="document contrato">
    <h1>Contrato de Prestação de Serviços</h1>
    <p>Pelo presente instrumento particular, as partes abaixo qualificadas têm entre si justo e contratado o seguinte:</p>

    <h3>CLÁUSULA PRIMEIRA - DAS PARTES</h3>
    <p><strong>CONTRATANTE:</strong> {client}, inscrito(a) no CPF/CNPJ sob o nº {client_id}, com endereço em {client_address}.</p>
    <p><strong>CONTRATADO:</strong> {contractor}, inscrito(a) no CPF/CNPJ sob o nº {contractor_id}, com endereço em {contractor_address}.</p>

    <h3>CLÁUSULA SEGUNDA - DO OBJETO</h3>
    <p>O presente contrato tem por objeto a prestação dos seguintes serviços:</p>
    <p>{object}</p>

    <h3>CLÁUSULA TERCEIRA - DO PRAZO</h3>
    <p>O presente contrato terá vigência de {start} a {end}.</p>

    <h3>CLÁUSULA QUARTA - DO PREÇO E PAGAMENTO</h3>
    <p>Pelos serviços prestados, o CONTRATANTE pagará ao CONTRATADO o valor total de <strong>{value}</strong> ({words}), a ser pago da seguinte forma: {payment}.</p>

    <h3>CLÁUSULA QUINTA - DAS OBRIGAÇÕES</h3>
    <p><strong>São obrigações do CONTRATADO:</strong></p>
    <ul>
        <li>Executar os serviços com qualidade e dentro do prazo estabelecido;</li>
        <li>Manter sigilo sobre as informações do CONTRATANTE;</li>
        <li>Comunicar imediatamente quaisquer problemas na execução.</li>
    </ul>
    <p><strong>São obrigações do CONTRATANTE:</strong></p>
    <ul>
        <li>Efetuar os pagamentos nas datas acordadas;</li>
        <li>Fornecer as informações necessárias para execução dos serviços;</li>
        <li>Comunicar alterações relevantes ao projeto.</li>
    </ul>

    <h3>CLÁUSULA SEXTA - DO FORO</h3>
    <p>Fica eleito o foro da comarca de residência do CONTRATANTE para dirimir quaisquer dúvidas ou litígios decorrentes deste contrato.</p>

    <p>E por estarem assim justas e contratadas, assinam o presente instrumento em duas vias de igual teor.</p>
    <p>_________________, {today}</p>

    <footer>
        <div class="signature"><p><strong>CONTRATANTE</strong></p><p>{client}</p></div>
        <div class="signature"><p><strong>CONTRATADO</strong></p><p>{contractor}</p></div>
    </footer>
</div>"#,
            client = escape_html(&self.client_name),
            client_id = escape_html(&self.client_tax_id),
            client_address = escape_html(&self.client_address),
            contractor = escape_html(contractor),
            contractor_id = escape_html(first_filled(&[&profile.cpf_cnpj], blank)),
            contractor_address = escape_html(first_filled(&[&profile.address], blank)),
            object = escape_html(&self.object),
            start = escape_html(&format_date(&self.start_date)),
            end = escape_html(&format_date(&self.end_date)),
            value = self.value,
            words = words,
            payment = escape_html(&self.payment_terms),
            today = today.format(DATE_FORMAT),
        ))
    }
}

// ============================================================================
// RECEIPT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Receipt {
    pub value: Amount,
    /// `YYYY-MM-DD`
    pub date: String,
    pub reference: String,
    pub payer_name: String,
    pub payer_tax_id: String,
    /// Receipt number, drawn when the receipt is generated
    pub number: Option<u32>,
}

impl Receipt {
    /// Four-digit receipt number (1000-9999)
    pub fn draw_number() -> u32 {
        (uuid::Uuid::new_v4().as_u128() % 9000) as u32 + 1000
    }

    fn number_or_zero(&self) -> u32 {
        self.number.unwrap_or_default()
    }
}

impl DocumentTemplate for Receipt {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Recibo
    }

    fn value(&self) -> Amount {
        self.value
    }

    fn apply_defaults(&mut self) {
        fill(&mut self.payer_name, "Pagador");
        if self.number.is_none() {
            self.number = Some(Receipt::draw_number());
        }
    }

    fn title(&self) -> String {
        format!("Recibo #{}", self.number_or_zero())
    }

    fn description(&self) -> String {
        format!("Pagador: {}", self.payer_name)
    }

    fn filename(&self, _generated_at: DateTime<Utc>) -> String {
        format!(
            "Recibo_{}_{}.html",
            self.number_or_zero(),
            underscored(&self.payer_name)
        )
    }

    fn render_html(&self, profile: &Profile, _today: NaiveDate) -> Result<String> {
        let issuer = first_filled(&[&profile.name], "Emitente");
        let payer_id = if self.payer_tax_id.is_empty() {
            String::new()
        } else {
            format!(", CPF/CNPJ: {}", escape_html(&self.payer_tax_id))
        };
        let words = self.value.to_words()?;

        Ok(format!(
            r#"<div class="document recibo">
    <header>
        <h1>RECIBO</h1>
        <p>Nº {number}</p>
        <p class="amount">{value}</p>
    </header>
    <p>Recebi de <strong>{payer}</strong>{payer_id}, a importância de <strong>{value}</strong> (<em>{words}</em>), referente a:</p>
    <div class="reference"><p>{reference}</p></div>
    <p>Para maior clareza, firmo o presente recibo para que produza os seus efeitos, dando plena, rasa e irrevogável quitação.</p>
    <footer>
        <div><p>Local e Data:</p><p><strong>{date}</strong></p></div>
        <div class="signature"><p><strong>{issuer}</strong></p><p>{issuer_id}</p></div>
    </footer>
</div>"#,
            number = self.number_or_zero(),
            value = self.value,
            payer = escape_html(&self.payer_name),
            payer_id = payer_id,
            words = words,
            reference = escape_html(&self.reference),
            date = escape_html(&format_date(&self.date)),
            issuer = escape_html(issuer),
            issuer_id = escape_html(&profile.cpf_cnpj),
        ))
    }
}

// ============================================================================
// PAGE & HELPERS
// ============================================================================

/// Wrap a fragment in a standalone page with a "save as PDF" button
pub fn printable_page(title: &str, fragment: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{ font-family: 'Segoe UI', Arial, sans-serif; background: white; color: #333; padding: 20px; }}
        @media print {{
            body {{ padding: 0; }}
            .no-print {{ display: none !important; }}
        }}
    </style>
</head>
<body>
{fragment}
<div class="no-print" style="margin-top: 30px; text-align: center;">
    <button onclick="window.print()">Salvar como PDF</button>
    <p>Na janela de impressão, selecione "Salvar como PDF" no destino</p>
</div>
</body>
</html>
"#,
        title = escape_html(title),
        fragment = fragment,
    )
}

/// `YYYY-MM-DD` -> `DD/MM/YYYY`. Empty input prints a blank to fill by hand;
/// anything unparseable is returned as typed.
pub fn format_date(date: &str) -> String {
    let trimmed = date.trim();
    if trimmed.is_empty() {
        return EMPTY_DATE.to_string();
    }

    match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        Ok(parsed) => parsed.format(DATE_FORMAT).to_string(),
        Err(_) => trimmed.to_string(),
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn fill(field: &mut String, fallback: &str) {
    if field.trim().is_empty() {
        *field = fallback.to_string();
    }
}

fn first_filled<'a>(candidates: &[&'a String], fallback: &'a str) -> &'a str {
    candidates
        .iter()
        .find(|c| !c.is_empty())
        .map(|c| c.as_str())
        .unwrap_or(fallback)
}

fn underscored(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}
