//! Builders for test documents and messages.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};

use underwriter::JobMessage;

/// Builds a PDF with one page per entry, each showing its text in Courier.
pub fn build_pdf(page_texts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let content = format!("BT /F1 12 Tf 50 700 Td ({}) Tj ET", text);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize test PDF");
    bytes
}

/// A message in the shape the upload API enqueues.
pub fn job_message(job_id: &str, filename: &str) -> JobMessage {
    JobMessage {
        job_id: job_id.to_string(),
        filename: filename.to_string(),
        blob_path: format!("documents/{}/{}", job_id, filename),
        insurance_type: Some("life".to_string()),
        timestamp: "2024-05-01T12:00:00".to_string(),
    }
}

pub const PAGE_REPLY: &str = r#"{
    "documentType": "application form",
    "keyValues": {"applicant": "John Smith", "coverage": "500000"},
    "summary": "Applicant details"
}"#;

pub const ANALYSIS_REPLY: &str = r#"```json
{
    "summary": "Low-risk applicant with complete disclosures.",
    "risks": [{"category": "medical", "severity": "low", "description": "Mild asthma", "page": 2}],
    "recommendations": ["Approve at standard rates"]
}
```"#;
