//! CV text extraction.
//!
//! Document parsing sits behind a trait seam: `extract(bytes, filename) ->
//! Result<String, ExtractError>`. The default extractor handles plain text,
//! PDF, and Word documents. Extraction is text-only; layout, styling, and
//! embedded media are discarded.

use docx_rs::{
    DocumentChild, ParagraphChild, RunChild, TableCellContent, TableChild, TableRowChild,
};

use crate::error::ExtractError;

/// File extensions accepted at the upload boundary.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = [".pdf", ".docx", ".doc", ".txt"];

/// Extraction seam for uploaded CV documents.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, content: &[u8], filename: &str) -> Result<String, ExtractError>;
}

/// Lowercased `.ext` suffix of a filename, empty when there is none.
pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => format!(".{}", ext.to_lowercase()),
        None => String::new(),
    }
}

/// Default extractor covering every supported extension.
///
/// `.txt` is read as lossy UTF-8. `.pdf` goes through `pdf-extract`. `.docx`
/// is walked with `docx-rs`: paragraphs joined by newlines, then each table
/// row appended as its non-empty cell texts joined with `" | "`. Legacy
/// `.doc` files are fed to the same DOCX parser; genuine old-format binaries
/// fail there with a parse error rather than being silently accepted.
#[derive(Debug, Default)]
pub struct DocumentTextExtractor;

impl TextExtractor for DocumentTextExtractor {
    fn extract(&self, content: &[u8], filename: &str) -> Result<String, ExtractError> {
        let extension = file_extension(filename);

        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(ExtractError::UnsupportedType(extension));
        }

        let text = match extension.as_str() {
            ".txt" => String::from_utf8_lossy(content).into_owned(),
            ".pdf" => extract_pdf(content)?,
            ".docx" | ".doc" => extract_docx(content, &extension)?,
            _ => unreachable!("extension vetted against SUPPORTED_EXTENSIONS"),
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(ExtractError::Empty);
        }

        Ok(text)
    }
}

fn extract_pdf(content: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(content).map_err(|err| ExtractError::Parse {
        kind: "PDF".to_string(),
        reason: err.to_string(),
    })
}

fn extract_docx(content: &[u8], extension: &str) -> Result<String, ExtractError> {
    let kind = if extension == ".doc" { "DOC" } else { "DOCX" };
    let docx = docx_rs::read_docx(content).map_err(|err| ExtractError::Parse {
        kind: kind.to_string(),
        reason: err.to_string(),
    })?;

    let mut lines: Vec<String> = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => {
                lines.push(paragraph_text(paragraph));
            }
            DocumentChild::Table(table) => {
                for row in &table.rows {
                    let TableChild::TableRow(row) = row;
                    let cells: Vec<String> = row
                        .cells
                        .iter()
                        .map(|cell| {
                            let TableRowChild::TableCell(cell) = cell;
                            cell_text(cell)
                        })
                        .filter(|text| !text.is_empty())
                        .collect();
                    if !cells.is_empty() {
                        lines.push(cells.join(" | "));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        match child {
            ParagraphChild::Run(run) => collect_run_text(run, &mut text),
            ParagraphChild::Hyperlink(link) => {
                for child in &link.children {
                    if let ParagraphChild::Run(run) = child {
                        collect_run_text(run, &mut text);
                    }
                }
            }
            _ => {}
        }
    }
    text.trim().to_string()
}

fn collect_run_text(run: &docx_rs::Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push(' '),
            _ => {}
        }
    }
}

fn cell_text(cell: &docx_rs::TableCell) -> String {
    let mut parts: Vec<String> = Vec::new();
    for content in &cell.children {
        if let TableCellContent::Paragraph(paragraph) = content {
            let text = paragraph_text(paragraph);
            if !text.is_empty() {
                parts.push(text);
            }
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};
    use std::io::Cursor;

    fn docx_bytes(docx: Docx) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        docx.build().pack(&mut buf).unwrap();
        buf.into_inner()
    }

    /// Single-page PDF with one Helvetica text run, offsets computed so the
    /// xref table is valid.
    fn pdf_bytes(text: &str) -> Vec<u8> {
        let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                stream.len(),
                stream
            ),
        ];

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref_at = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_at
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn test_txt_extraction() {
        let extractor = DocumentTextExtractor;
        let text = extractor
            .extract(b"Senior engineer, ten years of Rust.", "resume.txt")
            .unwrap();
        assert_eq!(text, "Senior engineer, ten years of Rust.");
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let extractor = DocumentTextExtractor;
        assert!(extractor.extract(b"hello", "RESUME.TXT").is_ok());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let extractor = DocumentTextExtractor;
        let err = extractor.extract(b"x", "resume.png").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedType(_)));

        let err = extractor.extract(b"x", "no_extension").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedType(_)));
    }

    #[test]
    fn test_whitespace_only_text_is_empty() {
        let extractor = DocumentTextExtractor;
        let err = extractor.extract(b"  \n\t ", "resume.txt").unwrap_err();
        assert!(matches!(err, ExtractError::Empty));
    }

    #[test]
    fn test_pdf_extraction() {
        let extractor = DocumentTextExtractor;
        let bytes = pdf_bytes("Rust systems engineer");
        let text = extractor.extract(&bytes, "resume.pdf").unwrap();
        assert!(text.contains("Rust systems engineer"), "got: {:?}", text);
    }

    #[test]
    fn test_corrupt_pdf_is_a_parse_error() {
        let extractor = DocumentTextExtractor;
        let err = extractor
            .extract(b"%PDF-1.4 not actually a pdf", "resume.pdf")
            .unwrap_err();
        assert!(matches!(err, ExtractError::Parse { .. }));
    }

    #[test]
    fn test_docx_paragraphs_and_table_rows() {
        let docx = Docx::new()
            .add_paragraph(
                Paragraph::new().add_run(Run::new().add_text("Senior Rust Engineer")),
            )
            .add_paragraph(
                Paragraph::new().add_run(Run::new().add_text("Ten years of backend work.")),
            )
            .add_table(Table::new(vec![TableRow::new(vec![
                TableCell::new()
                    .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Skill"))),
                TableCell::new()
                    .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Rust"))),
            ])]));

        let extractor = DocumentTextExtractor;
        let text = extractor.extract(&docx_bytes(docx), "resume.docx").unwrap();

        assert!(text.contains("Senior Rust Engineer\nTen years of backend work."));
        assert!(text.contains("Skill | Rust"));
    }

    #[test]
    fn test_legacy_doc_binary_is_a_parse_error() {
        // Old-format .doc files are not zip archives, so the DOCX reader
        // rejects them instead of returning garbage.
        let extractor = DocumentTextExtractor;
        let err = extractor
            .extract(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1], "resume.doc")
            .unwrap_err();
        assert!(matches!(err, ExtractError::Parse { kind, .. } if kind == "DOC"));
    }
}
