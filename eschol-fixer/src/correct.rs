//! Per-record correction: extract the cross-reference identifier,
//! resolve it, and rewrite the resource URL.
use crate::FixerResult;
use crate::RecordError;
use marcrec::Record;

/// Field/subfield carrying the ProQuest/UCLA cross-reference identifier.
const CROSS_REF_TAG: &str = "035";
const CROSS_REF_CODE: &str = "9";

/// Field/subfield carrying the resource URL to rewrite.
const URL_TAG: &str = "856";
const URL_CODE: &str = "u";

/// Cross-reference values read "(PREFIX)SUFFIX"; only SUFFIX is used.
const ID_DELIMITER: char = ')';

/// Width of the non-semantic shoulder on an eScholarship item id,
/// e.g. the "qt" on "qt1234567".
const SHOULDER_LEN: usize = 2;

const ESCHOL_ITEM_URL: &str = "http://escholarship.org/uc/item";

/// Resolves a UCLA cross-reference suffix to a canonical eScholarship
/// identifier.
///
/// `Ok(None)` means the store has no matching row, which is a
/// per-record condition; `Err` is reserved for transport and query
/// failures, which are fatal to the batch run.
pub trait CanonicalSource {
    fn canonical_id(&mut self, suffix: &str) -> FixerResult<Option<String>>;
}

/// Pull the cross-reference suffix from the record's 035 $9.
///
/// The portion after the first `)` is the suffix; a value with no
/// delimiter, or nothing after it, is malformed.
pub fn extract_cross_ref(record: &Record) -> Result<String, RecordError> {
    let value = record
        .first_field(CROSS_REF_TAG)
        .and_then(|f| f.first_subfield(CROSS_REF_CODE))
        .ok_or(RecordError::MissingField {
            tag: CROSS_REF_TAG,
            code: CROSS_REF_CODE,
        })?
        .content();

    match value.split_once(ID_DELIMITER) {
        Some((_prefix, suffix)) if !suffix.is_empty() => Ok(suffix.to_string()),
        _ => Err(RecordError::MalformedIdentifier(value.to_string())),
    }
}

/// Build the corrected item URL from a canonical id, trimming the
/// shoulder.
pub fn eschol_url(canonical_id: &str) -> Result<String, RecordError> {
    let item = canonical_id
        .get(SHOULDER_LEN..)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| RecordError::MalformedIdentifier(canonical_id.to_string()))?;

    Ok(format!("{ESCHOL_ITEM_URL}/{item}"))
}

/// Rewrite the record's 856 $u using the canonical id resolved from its
/// 035 $9 cross-reference.
///
/// Exactly one subfield value changes.  On any failure the record is
/// left untouched; per-record conditions surface as
/// [`crate::FixerError::Record`] so the batch runner can apply its
/// policy.
pub fn correct_record(record: &mut Record, source: &mut dyn CanonicalSource) -> FixerResult<()> {
    let suffix = extract_cross_ref(record)?;

    log::debug!("Querying eschol db for local id ucla:{suffix}");

    let canonical_id = source
        .canonical_id(&suffix)?
        .ok_or(RecordError::NotFound(suffix))?;

    let url = eschol_url(&canonical_id)?;

    let subfield = record
        .first_field_mut(URL_TAG)
        .and_then(|f| f.first_subfield_mut(URL_CODE))
        .ok_or(RecordError::MissingField {
            tag: URL_TAG,
            code: URL_CODE,
        })?;

    subfield.set_content(url);

    Ok(())
}
