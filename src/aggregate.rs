// src/aggregate.rs
use std::collections::HashMap;

use tracing::debug;
use url::Url;

use crate::models::{PartialSupplier, ResultTable, SourcedField, Supplier};

/// Identity key for a supplier: lowercase host with any `www.` prefix
/// stripped. Scheme, port, path and trailing slash do not participate,
/// so `http://Acme.com/` and `https://www.acme.com` share one key.
pub fn normalize_website(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = Url::parse(trimmed)
        .or_else(|_| Url::parse(&format!("https://{trimmed}")))
        .ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host
        .strip_prefix("www.")
        .map(str::to_string)
        .unwrap_or(host);

    if host.is_empty() || !host.contains('.') {
        None
    } else {
        Some(host)
    }
}

/// Folds page-level partials into one record per site. Emission order
/// is by lowest search rank, with arrival order breaking ties, so the
/// table content never depends on which fetch finished first.
pub fn aggregate(partials: Vec<PartialSupplier>) -> ResultTable {
    let mut groups: HashMap<String, Supplier> = HashMap::new();
    let mut arrival: Vec<String> = Vec::new();

    for partial in partials {
        let Some(site) = normalize_website(&partial.source_url) else {
            debug!(
                "Discarding partial with unusable website: {}",
                partial.source_url
            );
            continue;
        };

        match groups.get_mut(&site) {
            Some(existing) => merge_partial(existing, partial),
            None => {
                arrival.push(site.clone());
                groups.insert(site.clone(), supplier_from_partial(site, partial));
            }
        }
    }

    let mut suppliers: Vec<Supplier> = arrival
        .into_iter()
        .filter_map(|site| groups.remove(&site))
        .collect();
    suppliers.sort_by_key(|s| s.first_rank);

    ResultTable { suppliers }
}

/// Widens the email set with provider results, up to `cap` new entries.
/// Enrichment never touches any other field.
pub fn merge_enrichment(supplier: &mut Supplier, emails: Vec<String>, cap: usize) {
    let mut added = 0;
    for email in emails {
        if added >= cap {
            break;
        }
        let email = email.trim().to_lowercase();
        if email.is_empty() || supplier.emails.contains(&email) {
            continue;
        }
        supplier.emails.push(email);
        added += 1;
    }
    supplier.emails.sort();
}

fn supplier_from_partial(website: String, partial: PartialSupplier) -> Supplier {
    let mut supplier = Supplier {
        website,
        name: None,
        address: None,
        phone: None,
        emails: Vec::new(),
        certification_evidence: Vec::new(),
        first_rank: partial.rank,
    };
    merge_partial(&mut supplier, partial);
    supplier
}

fn merge_partial(supplier: &mut Supplier, partial: PartialSupplier) {
    supplier.first_rank = supplier.first_rank.min(partial.rank);
    merge_scalar(&mut supplier.name, partial.name);
    merge_scalar(&mut supplier.address, partial.address);
    merge_scalar(&mut supplier.phone, partial.phone);
    merge_emails(&mut supplier.emails, partial.emails);

    for snippet in partial.certification_evidence {
        if !supplier.certification_evidence.contains(&snippet) {
            supplier.certification_evidence.push(snippet);
        }
    }
}

/// Non-empty beats empty; higher provenance replaces lower; equal
/// provenance keeps the first-seen value.
fn merge_scalar(existing: &mut Option<SourcedField>, incoming: Option<SourcedField>) {
    let Some(incoming) = incoming else { return };
    if incoming.value.trim().is_empty() {
        return;
    }

    match existing {
        None => *existing = Some(incoming),
        Some(current) => {
            if incoming.provenance > current.provenance {
                *existing = Some(incoming);
            }
        }
    }
}

/// Case-insensitive union, kept sorted so the set never depends on the
/// order pages were merged in.
fn merge_emails(existing: &mut Vec<String>, incoming: Vec<String>) {
    for email in incoming {
        let email = email.trim().to_lowercase();
        if email.is_empty() || existing.contains(&email) {
            continue;
        }
        existing.push(email);
    }
    existing.sort();
}
