//! Document extraction: pull reference imagery out of PDF and DOCX files.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto the blocking
//! thread pool, so rendering never stalls the Tokio workers. Zip reading is
//! plain blocking I/O and rides along on the same pool.
//!
//! ## Why render PDF pages instead of unpacking embedded objects?
//!
//! PDF image objects are frequently CMYK, masked, or tiled in ways that need
//! colour-space conversion before a vision model can use them. Rendering the
//! page gives a clean RGB bitmap of what the reader actually sees. Page count
//! is capped (`max_pages`) to bound cost on long documents.
//!
//! Every failure is scoped to a single document: an unreadable or
//! unsupported file contributes nothing and the batch continues.

use crate::error::ImageFault;
use crate::outline::Provenance;
use crate::pipeline::sources::ImageSource;
use image::ImageFormat;
use pdfium_render::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Images pulled from documents plus per-document faults.
#[derive(Default)]
pub struct ExtractedImages {
    pub sources: Vec<ImageSource>,
    pub faults: Vec<ImageFault>,
}

/// Longest edge of a rendered PDF page, in pixels.
const RENDER_MAX_EDGE: i32 = 1600;

/// Extract reference imagery from all supplied documents.
///
/// One entry lands in `faults` per document that yielded nothing; the other
/// documents' contributions are unaffected.
pub async fn extract_from_documents(
    documents: &[PathBuf],
    scratch: &Path,
    max_pages: usize,
) -> ExtractedImages {
    let mut out = ExtractedImages::default();

    for document in documents {
        if !document.exists() {
            warn!("Document not found: {}", document.display());
            out.faults.push(ImageFault::Extraction {
                document: document.clone(),
                detail: "file not found".into(),
            });
            continue;
        }

        let extension = document
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let stem = document
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document")
            .to_string();
        let out_dir = scratch.join(&stem);

        let result = match extension.as_str() {
            "pdf" => {
                let doc = document.clone();
                tokio::task::spawn_blocking(move || render_pdf_pages(&doc, &out_dir, max_pages))
                    .await
                    .unwrap_or_else(|e| Err(format!("extraction task panicked: {e}")))
            }
            "docx" => {
                let doc = document.clone();
                tokio::task::spawn_blocking(move || unpack_docx_media(&doc, &out_dir))
                    .await
                    .unwrap_or_else(|e| Err(format!("extraction task panicked: {e}")))
            }
            other => Err(format!("unsupported document format: '.{other}'")),
        };

        match result {
            Ok(sources) => {
                info!(
                    "Extracted {} image(s) from {}",
                    sources.len(),
                    document.display()
                );
                out.sources.extend(sources);
            }
            Err(detail) => {
                warn!("Extraction failed for {}: {detail}", document.display());
                out.faults.push(ImageFault::Extraction {
                    document: document.clone(),
                    detail,
                });
            }
        }
    }

    out
}

/// Render the first `max_pages` pages of a PDF to PNG files.
fn render_pdf_pages(
    pdf_path: &Path,
    out_dir: &Path,
    max_pages: usize,
) -> Result<Vec<ImageSource>, String> {
    std::fs::create_dir_all(out_dir).map_err(|e| format!("cannot create scratch dir: {e}"))?;

    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| format!("cannot open PDF: {e:?}"))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    let selected = total.min(max_pages);
    debug!(
        "PDF {} has {total} pages, rendering {selected}",
        pdf_path.display()
    );

    let render_config = PdfRenderConfig::new()
        .set_target_width(RENDER_MAX_EDGE)
        .set_maximum_height(RENDER_MAX_EDGE);

    let mut sources = Vec::with_capacity(selected);
    for idx in 0..selected {
        let rendered = pages
            .get(idx as u16)
            .and_then(|page| page.render_with_config(&render_config).map(|b| b.as_image()));
        let image = match rendered {
            Ok(image) => image,
            Err(e) => {
                warn!("Skipping page {} of {}: {e:?}", idx + 1, pdf_path.display());
                continue;
            }
        };

        let path = out_dir.join(format!("pdf_page_{}.png", idx + 1));
        if let Err(e) = image.save(&path) {
            warn!("Cannot write rendered page {}: {e}", idx + 1);
            continue;
        }

        sources.push(ImageSource {
            path,
            provenance: Provenance::Extracted {
                document: pdf_path.to_path_buf(),
                page: Some(idx + 1),
                index: idx + 1,
            },
        });
    }

    Ok(sources)
}

/// Copy the raster images embedded under `word/media/` out of a DOCX archive.
fn unpack_docx_media(docx_path: &Path, out_dir: &Path) -> Result<Vec<ImageSource>, String> {
    let file = std::fs::File::open(docx_path).map_err(|e| format!("cannot open: {e}"))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| format!("not a zip archive: {e}"))?;

    std::fs::create_dir_all(out_dir).map_err(|e| format!("cannot create scratch dir: {e}"))?;

    let mut sources = Vec::new();
    let mut image_count = 0usize;

    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping archive entry {i}: {e}");
                continue;
            }
        };
        if entry.is_dir() || !entry.name().starts_with("word/media/") {
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        if let Err(e) = entry.read_to_end(&mut bytes) {
            warn!("Skipping unreadable media entry '{}': {e}", entry.name());
            continue;
        }

        // DOCX media also holds WMF/EMF vectors the image stack cannot
        // decode; keep only raster formats the analyzer can reopen.
        let extension = match image::guess_format(&bytes) {
            Ok(ImageFormat::Png) => "png",
            Ok(ImageFormat::Jpeg) => "jpg",
            Ok(ImageFormat::Gif) => "gif",
            Ok(ImageFormat::Bmp) => "bmp",
            Ok(ImageFormat::WebP) => "webp",
            _ => {
                debug!("Skipping non-raster media entry '{}'", entry.name());
                continue;
            }
        };

        image_count += 1;
        let path = out_dir.join(format!("docx_img{image_count}.{extension}"));
        if let Err(e) = std::fs::write(&path, &bytes) {
            warn!("Cannot write media entry '{}': {e}", entry.name());
            continue;
        }

        sources.push(ImageSource {
            path,
            provenance: Provenance::Extracted {
                document: docx_path.to_path_buf(),
                page: None,
                index: image_count,
            },
        });
    }

    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build a minimal DOCX-shaped zip with the given media entries.
    fn write_docx(path: &Path, media: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).expect("create docx");
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        writer
            .start_file("word/document.xml", options)
            .expect("start entry");
        writer.write_all(b"<w:document/>").expect("write entry");
        for (name, bytes) in media {
            writer
                .start_file(format!("word/media/{name}"), options)
                .expect("start media");
            writer.write_all(bytes).expect("write media");
        }
        writer.finish().expect("finish zip");
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([10, 20, 30, 255]),
        ));
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode png");
        buf
    }

    #[tokio::test]
    async fn docx_media_is_extracted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let docx = dir.path().join("report.docx");
        write_docx(&docx, &[("chart.png", &png_bytes()), ("junk.bin", b"\x00\x01")]);

        let out = extract_from_documents(&[docx.clone()], dir.path(), 10).await;
        assert_eq!(out.sources.len(), 1, "only the decodable PNG survives");
        assert!(out.faults.is_empty());
        match &out.sources[0].provenance {
            Provenance::Extracted { document, page, index } => {
                assert_eq!(document, &docx);
                assert_eq!(*page, None);
                assert_eq!(*index, 1);
            }
            other => panic!("unexpected provenance: {other:?}"),
        }
        assert!(out.sources[0].path.exists());
    }

    #[tokio::test]
    async fn corrupt_document_does_not_zero_the_batch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("good.docx");
        write_docx(&good, &[("pic.png", &png_bytes())]);
        let corrupt = dir.path().join("corrupt.docx");
        std::fs::write(&corrupt, b"this is not a zip archive").expect("write");

        let out = extract_from_documents(&[corrupt.clone(), good], dir.path(), 10).await;
        assert_eq!(out.sources.len(), 1, "valid document still contributes");
        assert_eq!(out.faults.len(), 1);
        assert!(matches!(
            &out.faults[0],
            ImageFault::Extraction { document, .. } if document == &corrupt
        ));
    }

    #[tokio::test]
    async fn unsupported_format_yields_empty_contribution() {
        let dir = tempfile::tempdir().expect("tempdir");
        let legacy = dir.path().join("old.doc");
        std::fs::write(&legacy, b"\xd0\xcf\x11\xe0legacy").expect("write");

        let out = extract_from_documents(&[legacy], dir.path(), 10).await;
        assert!(out.sources.is_empty());
        assert_eq!(out.faults.len(), 1);
    }

    #[tokio::test]
    async fn missing_document_is_a_fault() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out =
            extract_from_documents(&[PathBuf::from("/no/such/doc.pdf")], dir.path(), 10).await;
        assert!(out.sources.is_empty());
        assert_eq!(out.faults.len(), 1);
    }
}
