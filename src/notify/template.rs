//! Completion email template

use crate::traits::EmailMessage;

pub const COMPLETION_SUBJECT: &str = "✅ Su documento ha sido anclado en Bitcoin";

/// `first16...last8` of a document hash
pub fn abbreviate_hash(document_hash: &str) -> String {
    let chars: Vec<char> = document_hash.chars().collect();
    let head: String = chars.iter().take(16).collect();
    let tail: String = chars[chars.len().saturating_sub(8)..].iter().collect();
    format!("{head}...{tail}")
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML body announcing that a document was anchored
pub fn completion_html(document_hash: &str, anchor_id: &str) -> String {
    format!(
        "<h2>Documento anclado exitosamente en Bitcoin</h2>\n\
         <p>¡Hola!</p>\n\
         <p>Su documento con hash <strong>{hash}</strong> \
         ha sido anclado con éxito en la blockchain de Bitcoin.</p>\n\
         <p>El ID de su anclaje es: <strong>{id}</strong></p>\n\
         <p>Este anclaje proporciona una prueba de existencia inmutable que cualquiera puede verificar.</p>\n\
         <p>Gracias por usar EcoSign.</p>\n\
         <p>Saludos,<br>El equipo de EcoSign</p>\n",
        hash = escape_html(&abbreviate_hash(document_hash)),
        id = escape_html(anchor_id),
    )
}

/// Full completion message for one recipient
pub fn completion_email(sender: &str, to: &str, document_hash: &str, anchor_id: &str) -> EmailMessage {
    EmailMessage {
        from: sender.to_string(),
        to: vec![to.to_string()],
        subject: COMPLETION_SUBJECT.to_string(),
        html: completion_html(document_hash, anchor_id),
    }
}
