//! Quarantine pass: move suspect records out of the catalog into an audit
//! CSV instead of deleting them outright.
//!
//! Four rules with different risk profiles, from "sweep every photo import"
//! down to the conservative no-metadata case. The audit file is written
//! before anything is removed, so an interrupted run never loses data.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};

use crate::gibberish::{looks_gibberish, GibberishOptions};

use super::types::{BookRecord, Result};
use super::{has_isbn, has_protected_copy, plausible_year};

/// Copy status set by the photo import pipeline.
pub const FOTO_STATUS: &str = "Foto erfasst";

/// Options for the quarantine scan.
#[derive(Debug, Clone, Default)]
pub struct QuarantineOptions {
    /// Sweep every photo-imported book, regardless of its text fields.
    pub include_foto_erfasst_all: bool,
    /// Flag on a gibberish title or author alone, without requiring the
    /// other metadata preconditions.
    pub aggressive_titles: bool,
    /// Let the aggressive rule fire even when the record carries an ISBN.
    pub ignore_isbn_safety: bool,
}

/// Why a book was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarantineReason {
    FotoImportSweep,
    TitleOrAuthorGibberish,
    TitleAndAuthorGibberish,
    FotoImportOcr,
}

impl QuarantineReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuarantineReason::FotoImportSweep => "foto-import sweep",
            QuarantineReason::TitleOrAuthorGibberish => "title/author gibberish",
            QuarantineReason::TitleAndAuthorGibberish => "title+author gibberish",
            QuarantineReason::FotoImportOcr => "foto-import ocr",
        }
    }
}

/// One flagged book with its reason.
#[derive(Debug)]
pub struct QuarantineCandidate {
    pub book_id: String,
    pub reason: QuarantineReason,
}

fn is_foto_import(book: &BookRecord) -> bool {
    book.copies
        .iter()
        .any(|c| c.digitization_status == FOTO_STATUS)
}

/// Classify one book under the quarantine rules.
pub fn quarantine_reason(
    book: &BookRecord,
    current_year: i32,
    options: &QuarantineOptions,
    gib: &GibberishOptions,
) -> Option<QuarantineReason> {
    if has_protected_copy(book) {
        return None;
    }

    let isbn = has_isbn(book);
    let publisher = !book.publisher.trim().is_empty();
    let year_ok = plausible_year(book.year, current_year);
    let title_gib = looks_gibberish(Some(book.title.trim()), gib);
    let author_gib = looks_gibberish(Some(book.author.trim()), gib);
    let foto = is_foto_import(book);

    // 1) sweep: every photo import, text fields ignored
    if options.include_foto_erfasst_all && foto {
        return Some(QuarantineReason::FotoImportSweep);
    }
    // 2) aggressive: one bad text field, ISBN still protects by default
    if options.aggressive_titles
        && (title_gib || author_gib)
        && (options.ignore_isbn_safety || !isbn)
    {
        return Some(QuarantineReason::TitleOrAuthorGibberish);
    }
    // 3) conservative: both fields bad and no structured metadata at all
    if !isbn && !publisher && !year_ok && title_gib && author_gib {
        return Some(QuarantineReason::TitleAndAuthorGibberish);
    }
    // 4) mild photo-OCR rule, active only while the sweep is off
    if !options.include_foto_erfasst_all && foto && (title_gib || author_gib) && !isbn {
        return Some(QuarantineReason::FotoImportOcr);
    }
    None
}

/// Scan all books and collect quarantine candidates.
pub fn plan_quarantine(
    books: &[BookRecord],
    current_year: i32,
    options: &QuarantineOptions,
    gib: &GibberishOptions,
) -> Vec<QuarantineCandidate> {
    let candidates: Vec<QuarantineCandidate> = books
        .iter()
        .filter_map(|book| {
            quarantine_reason(book, current_year, options, gib).map(|reason| {
                QuarantineCandidate {
                    book_id: book.id.clone(),
                    reason,
                }
            })
        })
        .collect();
    info!(
        scanned = books.len(),
        flagged = candidates.len(),
        "quarantine scan complete"
    );
    candidates
}

/// Write the audit CSV for flagged books, one row per copy so the image
/// references survive removal. The filename carries a local timestamp so
/// repeated runs never clobber earlier audits. Returns the path written.
pub fn write_audit_csv(
    output_dir: &Path,
    image_root: &Path,
    books: &[BookRecord],
    candidates: &[QuarantineCandidate],
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let name = Local::now().format("quarantine_%Y%m%d_%H%M.csv").to_string();
    let path = output_dir.join(name);

    let mut writer = csv::Writer::from_path(&path)?;
    writer.write_record([
        "book_id",
        "author",
        "title",
        "publisher",
        "isbn10",
        "isbn13",
        "year",
        "copy_id",
        "signatur",
        "status",
        "cover_local_src",
        "cover_online",
    ])?;
    for candidate in candidates {
        let Some(book) = books.iter().find(|b| b.id == candidate.book_id) else {
            continue;
        };
        let year = book.year.map(|y| y.to_string()).unwrap_or_default();
        if book.copies.is_empty() {
            writer.write_record([
                book.id.as_str(),
                book.author.as_str(),
                book.title.as_str(),
                book.publisher.as_str(),
                book.isbn10.as_str(),
                book.isbn13.as_str(),
                year.as_str(),
                "",
                "",
                "",
                "",
                "",
            ])?;
            continue;
        }
        for copy in &book.copies {
            let src = resolve_image_path(image_root, &copy.cover_local)
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            writer.write_record([
                book.id.as_str(),
                book.author.as_str(),
                book.title.as_str(),
                book.publisher.as_str(),
                book.isbn10.as_str(),
                book.isbn13.as_str(),
                year.as_str(),
                copy.id.as_str(),
                copy.signature.as_str(),
                copy.digitization_status.as_str(),
                src.as_str(),
                copy.cover_online.as_str(),
            ])?;
        }
    }
    writer.flush()?;
    info!(path = %path.display(), flagged = candidates.len(), "audit file written");
    Ok(path)
}

/// Resolve a copy's recorded cover path against the layouts the import
/// pipeline has written over time, all relative to `image_root`.
pub fn resolve_image_path(image_root: &Path, cover_local: &str) -> Option<PathBuf> {
    if cover_local.trim().is_empty() {
        return None;
    }
    let normalized = cover_local.replace('\\', "/");
    let mut candidates: Vec<PathBuf> = Vec::new();
    if normalized.starts_with("output/") {
        candidates.push(image_root.join(&normalized));
    }
    if normalized.starts_with("thumbnails/") {
        candidates.push(image_root.join("output").join(&normalized));
    }
    if let Some(rest) = normalized.strip_prefix("../") {
        if rest.starts_with("fotos/") {
            candidates.push(image_root.join(rest));
        }
    }
    if normalized.starts_with("fotos/") {
        candidates.push(image_root.join(&normalized));
    }
    candidates.push(image_root.join("output").join(&normalized));
    candidates.into_iter().find(|p| p.exists())
}

/// Copy flagged books' cover images into an `images/` directory next to
/// the audit CSV. Failures are logged and skipped, never fatal: the audit
/// CSV is the record of truth.
pub fn archive_images(
    output_dir: &Path,
    image_root: &Path,
    books: &[BookRecord],
    candidates: &[QuarantineCandidate],
) -> usize {
    let images_dir = output_dir.join("images");
    if let Err(e) = fs::create_dir_all(&images_dir) {
        warn!(dir = %images_dir.display(), "cannot create image archive: {e}");
        return 0;
    }
    let mut copied = 0;
    for candidate in candidates {
        let Some(book) = books.iter().find(|b| b.id == candidate.book_id) else {
            continue;
        };
        for copy in &book.copies {
            let Some(source) = resolve_image_path(image_root, &copy.cover_local) else {
                debug!(book = %book.id, copy = %copy.id, "no cover image found");
                continue;
            };
            let ext = source
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("jpg");
            let target = images_dir.join(format!("book_{}__copy_{}.{ext}", book.id, copy.id));
            match fs::copy(&source, &target) {
                Ok(_) => copied += 1,
                Err(e) => warn!(source = %source.display(), "image archive failed: {e}"),
            }
        }
    }
    copied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::types::CopyRecord;

    const YEAR: i32 = 2026;
    const JUNK: &str = "xk#~jq$%wz^&rt*{}=+§";

    fn book(id: &str, title: &str, author: &str) -> BookRecord {
        BookRecord {
            id: id.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            ..Default::default()
        }
    }

    fn foto_copy(id: &str) -> CopyRecord {
        CopyRecord {
            id: id.to_string(),
            digitization_status: FOTO_STATUS.to_string(),
            ..Default::default()
        }
    }

    fn reason(b: &BookRecord, options: &QuarantineOptions) -> Option<QuarantineReason> {
        quarantine_reason(b, YEAR, options, &GibberishOptions::quarantine())
    }

    #[test]
    fn test_no_metadata_gibberish_flagged() {
        let b = book("1", JUNK, "");
        assert_eq!(
            reason(&b, &QuarantineOptions::default()),
            Some(QuarantineReason::TitleAndAuthorGibberish)
        );
    }

    #[test]
    fn test_clean_record_not_flagged() {
        let b = book("1", "Die Blechtrommel", "Günter Grass");
        assert!(reason(&b, &QuarantineOptions::default()).is_none());
    }

    #[test]
    fn test_publisher_or_year_blocks_conservative_rule() {
        let mut b = book("1", JUNK, "");
        b.publisher = "dtv".to_string();
        assert!(reason(&b, &QuarantineOptions::default()).is_none());

        let mut b = book("2", JUNK, "");
        b.year = Some(1990);
        assert!(reason(&b, &QuarantineOptions::default()).is_none());
    }

    #[test]
    fn test_isbn_presence_blocks_conservative_rule() {
        // a wrong check digit still counts as "ISBN on file"
        let mut b = book("1", JUNK, "");
        b.isbn10 = "1234567890".to_string();
        assert!(reason(&b, &QuarantineOptions::default()).is_none());
    }

    #[test]
    fn test_aggressive_rule_fires_on_one_bad_field() {
        let b = book("1", JUNK, "Günter Grass");
        assert!(reason(&b, &QuarantineOptions::default()).is_none());

        let options = QuarantineOptions {
            aggressive_titles: true,
            ..Default::default()
        };
        assert_eq!(
            reason(&b, &options),
            Some(QuarantineReason::TitleOrAuthorGibberish)
        );

        // gibberish author alone also fires
        let b = book("2", "Die Blechtrommel", JUNK);
        assert_eq!(
            reason(&b, &options),
            Some(QuarantineReason::TitleOrAuthorGibberish)
        );
    }

    #[test]
    fn test_aggressive_rule_respects_isbn_unless_overridden() {
        let mut b = book("1", JUNK, "Günter Grass");
        b.isbn13 = "9783161484100".to_string();
        let options = QuarantineOptions {
            aggressive_titles: true,
            ..Default::default()
        };
        assert!(reason(&b, &options).is_none());

        let options = QuarantineOptions {
            aggressive_titles: true,
            ignore_isbn_safety: true,
            ..Default::default()
        };
        assert!(reason(&b, &options).is_some());
    }

    #[test]
    fn test_foto_sweep_takes_every_photo_import() {
        let mut b = book("1", "Die Blechtrommel", "Günter Grass");
        b.isbn13 = "9783161484100".to_string();
        b.publisher = "dtv".to_string();
        b.copies.push(foto_copy("10"));
        let options = QuarantineOptions {
            include_foto_erfasst_all: true,
            ..Default::default()
        };
        assert_eq!(reason(&b, &options), Some(QuarantineReason::FotoImportSweep));
        assert!(reason(&b, &QuarantineOptions::default()).is_none());
    }

    #[test]
    fn test_mild_foto_ocr_rule_active_without_sweep() {
        // clean author keeps the conservative rule out of the way
        let mut b = book("1", JUNK, "Günter Grass");
        b.publisher = "dtv".to_string();
        b.copies.push(foto_copy("10"));
        assert_eq!(
            reason(&b, &QuarantineOptions::default()),
            Some(QuarantineReason::FotoImportOcr)
        );

        // ISBN protects the mild rule
        b.isbn13 = "9783161484100".to_string();
        assert!(reason(&b, &QuarantineOptions::default()).is_none());
    }

    #[test]
    fn test_protected_copy_blocks_quarantine() {
        let mut b = book("1", JUNK, "");
        b.copies.push(CopyRecord {
            id: "10".to_string(),
            digitization_status: "Gemini-Import".to_string(),
            ..Default::default()
        });
        assert!(reason(&b, &QuarantineOptions::default()).is_none());
    }

    #[test]
    fn test_audit_csv_has_per_copy_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut b = book("1", JUNK, "");
        b.copies.push(CopyRecord {
            id: "10".to_string(),
            signature: "A-12".to_string(),
            digitization_status: FOTO_STATUS.to_string(),
            cover_online: "http://example/cover.jpg".to_string(),
            ..Default::default()
        });
        b.copies.push(CopyRecord {
            id: "11".to_string(),
            ..Default::default()
        });
        let books = vec![b];
        let candidates = plan_quarantine(
            &books,
            YEAR,
            &QuarantineOptions::default(),
            &GibberishOptions::quarantine(),
        );
        assert_eq!(candidates.len(), 1);

        let path = write_audit_csv(dir.path(), dir.path(), &books, &candidates).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "book_id,author,title,publisher,isbn10,isbn13,year,copy_id,signatur,status,cover_local_src,cover_online"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("A-12"));
        assert!(lines[1].contains("Foto erfasst"));
        assert!(lines[1].contains("http://example/cover.jpg"));
        assert!(lines[2].contains(",11,"));
    }

    #[test]
    fn test_resolve_image_path_layouts() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("output/thumbnails")).unwrap();
        fs::create_dir_all(root.path().join("fotos")).unwrap();
        let thumb = root.path().join("output/thumbnails/b1.jpg");
        fs::write(&thumb, b"jpg").unwrap();
        let foto = root.path().join("fotos/shelf.jpg");
        fs::write(&foto, b"jpg").unwrap();

        assert_eq!(
            resolve_image_path(root.path(), "thumbnails/b1.jpg"),
            Some(thumb.clone())
        );
        // windows-style separators are normalized
        assert_eq!(
            resolve_image_path(root.path(), r"thumbnails\b1.jpg"),
            Some(thumb)
        );
        assert_eq!(
            resolve_image_path(root.path(), "../fotos/shelf.jpg"),
            Some(foto.clone())
        );
        assert_eq!(resolve_image_path(root.path(), "fotos/shelf.jpg"), Some(foto));
        assert_eq!(resolve_image_path(root.path(), ""), None);
        assert_eq!(resolve_image_path(root.path(), "fotos/missing.jpg"), None);
    }

    #[test]
    fn test_archive_images_copies_resolved_covers() {
        let out = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("fotos")).unwrap();
        fs::write(root.path().join("fotos/shelf.jpg"), b"jpg").unwrap();

        let mut b = book("1", JUNK, "");
        b.copies.push(CopyRecord {
            id: "10".to_string(),
            cover_local: "fotos/shelf.jpg".to_string(),
            ..Default::default()
        });
        b.copies.push(CopyRecord {
            id: "11".to_string(),
            ..Default::default()
        });
        let candidates = vec![QuarantineCandidate {
            book_id: "1".to_string(),
            reason: QuarantineReason::TitleAndAuthorGibberish,
        }];
        let copied = archive_images(out.path(), root.path(), &[b], &candidates);
        assert_eq!(copied, 1);
        assert!(out.path().join("images/book_1__copy_10.jpg").exists());
    }
}
