use super::*;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

fn pdf_bytes(line: &str) -> Vec<u8> {
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
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(line)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("should encode content"),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("should save pdf");
    bytes
}

fn word_bytes(body: &str) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(DOCX_BODY, SimpleFileOptions::default())
        .expect("should start entry");
    writer
        .write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
            )
            .as_bytes(),
        )
        .expect("should write entry");
    writer.finish().expect("should finish archive").into_inner()
}

fn write_file(temp_dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = temp_dir.path().join(name);
    fs::write(&path, bytes).expect("should write file");
    path
}

#[test]
fn kind_follows_extension() {
    assert_eq!(FileKind::from_path(Path::new("a/Syllabus.PDF")), FileKind::Pdf);
    assert_eq!(FileKind::from_path(Path::new("notes.docx")), FileKind::Word);
    assert_eq!(FileKind::from_path(Path::new("old.doc")), FileKind::Word);
    assert_eq!(FileKind::from_path(Path::new("fees.txt")), FileKind::Text);
    assert_eq!(FileKind::from_path(Path::new("readme.md")), FileKind::Other);
    assert_eq!(FileKind::from_path(Path::new("Makefile")), FileKind::Other);
}

#[test]
fn pdf_text_layer_is_extracted() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_file(&temp_dir, "timetable.pdf", &pdf_bytes("Exams start in May"));

    let text = extract_text(&path).expect("should extract pdf");
    assert!(text.contains("Exams start in May"), "got {text:?}");
}

#[test]
fn broken_pdf_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_file(&temp_dir, "broken.pdf", b"plain words, not a pdf");

    let error = extract_text(&path).expect_err("should reject broken pdf");
    assert!(format!("{error:#}").contains("broken.pdf"));
}

#[test]
fn word_paragraphs_become_lines() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let body = concat!(
        "<w:p><w:r><w:t>Fees &amp; dues</w:t></w:r></w:p>",
        "<w:p/>",
        r#"<w:p><w:r><w:t xml:space="preserve">Pay by </w:t></w:r><w:r><w:t>March</w:t></w:r></w:p>"#,
    );
    let path = write_file(&temp_dir, "fees.docx", &word_bytes(body));

    let text = extract_text(&path).expect("should extract docx");
    assert_eq!(text, "Fees & dues\n\nPay by March\n");
}

#[test]
fn doc_extension_uses_the_word_reader() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_file(
        &temp_dir,
        "legacy.doc",
        &word_bytes("<w:p><w:r><w:t>Saved as doc</w:t></w:r></w:p>"),
    );

    assert_eq!(extract_text(&path).expect("should extract doc"), "Saved as doc\n");
}

#[test]
fn word_archive_without_body_is_an_error() {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/styles.xml", SimpleFileOptions::default())
        .expect("should start entry");
    let bytes = writer.finish().expect("should finish archive").into_inner();

    assert!(extract_bytes(FileKind::Word, &bytes).is_err());
    assert!(extract_bytes(FileKind::Word, b"not a zip").is_err());
}

#[test]
fn txt_must_be_utf8() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let good = write_file(&temp_dir, "good.txt", "Café hours: 8 to 5".as_bytes());
    let bad = write_file(&temp_dir, "bad.txt", &[0x66, 0x6f, 0xff, 0x6f]);

    assert_eq!(extract_text(&good).expect("should read txt"), "Café hours: 8 to 5");
    assert!(extract_text(&bad).is_err());
}

#[test]
fn unknown_extension_is_read_lossily() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = write_file(&temp_dir, "notes.md", &[0x66, 0x6f, 0xff, 0x6f]);

    assert_eq!(extract_text(&path).expect("should read"), "fo\u{fffd}o");
}
