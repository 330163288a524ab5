//! Destination naming and folder routing for stored invoices.
//!
//! Files land under `root/<year>/<rule folder>/` with a
//! `YYYYMMDD_prefix_originalname.ext` filename, the date being the invoice
//! date. Collision suffixing (`_1`, `_2`, ...) is computed here but enforced
//! in the storage client, which is the only writer.

use std::path::{Path, PathBuf};

use crate::models::invoice::ExtractedInvoice;
use crate::models::rules::PartnerRule;

/// Replace path-hostile characters so the name is safe as a single
/// file or folder component on every filesystem the sync root may live on.
pub fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            ' ' => '_',
            c => c,
        })
        .collect();
    cleaned.trim_matches(['.', '_']).to_string()
}

/// Folder names additionally spell out `@` and are capped at 50 characters.
pub fn sanitize_folder_name(name: &str) -> String {
    let cleaned = sanitize_component(name).replace('@', "_at_");
    cleaned.chars().take(50).collect()
}

/// The renamed destination filename: `YYYYMMDD_prefix_originalstem.ext`.
pub fn destination_file_name(rule: &PartnerRule, invoice: &ExtractedInvoice) -> String {
    let source = Path::new(&invoice.source_file);
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| invoice.source_file.clone());
    let stem = sanitize_component(&stem);
    let date = invoice.invoice_date.format("%Y%m%d");

    match source.extension() {
        Some(ext) => format!(
            "{}_{}_{}.{}",
            date,
            rule.filename_prefix,
            stem,
            ext.to_string_lossy()
        ),
        None => format!("{}_{}_{}", date, rule.filename_prefix, stem),
    }
}

/// The destination folder: `root/<year>/<rule folder>`, year taken from the
/// invoice date.
pub fn destination_folder(root: &Path, rule: &PartnerRule, invoice: &ExtractedInvoice) -> PathBuf {
    root.join(invoice.invoice_date.format("%Y").to_string())
        .join(sanitize_folder_name(&rule.folder))
}

/// Filename and folder for one invoice, the single naming entry point.
pub fn compute_destination(
    rule: &PartnerRule,
    invoice: &ExtractedInvoice,
    root: &Path,
) -> (String, PathBuf) {
    (
        destination_file_name(rule, invoice),
        destination_folder(root, rule, invoice),
    )
}

/// First non-existing path for `file_name` inside `dir`, suffixing the stem
/// with `_1`, `_2`, ... until a free slot is found.
pub fn next_available_path(dir: &Path, file_name: &str) -> PathBuf {
    let direct = dir.join(file_name);
    if !direct.exists() {
        return direct;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = name.extension().map(|e| e.to_string_lossy().into_owned());

    let mut counter = 1u32;
    loop {
        let candidate = match &ext {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
        let path = dir.join(candidate);
        if !path.exists() {
            return path;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn sample(source_file: &str) -> (PartnerRule, ExtractedInvoice) {
        let rule = PartnerRule {
            name: "vodafone".to_string(),
            filename_prefix: "vodafone".to_string(),
            folder: "Vodafone".to_string(),
            ..PartnerRule::default()
        };
        let invoice = ExtractedInvoice {
            partner: "vodafone".to_string(),
            amount: None,
            amount_eur: None,
            due_date: NaiveDate::from_ymd_opt(2025, 9, 15).unwrap(),
            invoice_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            invoice_number: "KI2501065".to_string(),
            source_file: source_file.to_string(),
            low_confidence: Vec::new(),
        };
        (rule, invoice)
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("Vodafone"), "Vodafone");
        assert_eq!(sanitize_component("a/b:c*d"), "a_b_c_d");
        assert_eq!(sanitize_component("  havi szamla.  "), "havi_szamla");
        assert_eq!(sanitize_component("..hidden.."), "hidden");
    }

    #[test]
    fn test_folder_name_spells_out_at_and_caps_length() {
        assert_eq!(
            sanitize_folder_name("billing@acme.com"),
            "billing_at_acme.com"
        );
        let long = "x".repeat(80);
        assert_eq!(sanitize_folder_name(&long).chars().count(), 50);
    }

    #[test]
    fn test_destination_file_name() {
        let (rule, invoice) = sample("E-szamla 2025-09.pdf");
        assert_eq!(
            destination_file_name(&rule, &invoice),
            "20250901_vodafone_E-szamla_2025-09.pdf"
        );
    }

    #[test]
    fn test_destination_without_extension() {
        let (rule, invoice) = sample("szamla");
        assert_eq!(
            destination_file_name(&rule, &invoice),
            "20250901_vodafone_szamla"
        );
    }

    #[test]
    fn test_destination_folder_year_partition() {
        let (rule, invoice) = sample("szamla.pdf");
        let folder = destination_folder(Path::new("/sync"), &rule, &invoice);
        assert_eq!(folder, PathBuf::from("/sync/2025/Vodafone"));
    }

    #[test]
    fn test_compute_destination() {
        let (rule, invoice) = sample("szamla.pdf");
        let (name, folder) = compute_destination(&rule, &invoice, Path::new("/sync"));
        assert_eq!(name, "20250901_vodafone_szamla.pdf");
        assert_eq!(folder, PathBuf::from("/sync/2025/Vodafone"));
    }

    #[test]
    fn test_collision_suffixing() {
        let dir = tempfile::tempdir().unwrap();
        let file_name = "20250901_vodafone_szamla.pdf";

        assert_eq!(
            next_available_path(dir.path(), file_name),
            dir.path().join(file_name)
        );

        std::fs::write(dir.path().join(file_name), b"first").unwrap();
        assert_eq!(
            next_available_path(dir.path(), file_name),
            dir.path().join("20250901_vodafone_szamla_1.pdf")
        );

        std::fs::write(dir.path().join("20250901_vodafone_szamla_1.pdf"), b"second").unwrap();
        assert_eq!(
            next_available_path(dir.path(), file_name),
            dir.path().join("20250901_vodafone_szamla_2.pdf")
        );
    }

    #[test]
    fn test_existing_files_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let file_name = "szamla.pdf";

        for _ in 0..5 {
            let path = next_available_path(dir.path(), file_name);
            assert!(!path.exists());
            std::fs::write(&path, b"x").unwrap();
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 5);
    }
}
