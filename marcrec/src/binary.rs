//! Reading and writing binary MARC21 (ISO 2709) records.
use crate::Controlfield;
use crate::Field;
use crate::Record;
use crate::Subfield;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;

const END_OF_FIELD: u8 = 0x1E;
const END_OF_RECORD: u8 = 0x1D;
const SUBFIELD_DELIMITER: u8 = 0x1F;
const LEADER_LEN: usize = 24;
const RECORD_LEN_DIGITS: usize = 5;
const BASE_ADDRESS_OFFSET: usize = 12;
const BASE_ADDRESS_DIGITS: usize = 5;
const DIR_ENTRY_LEN: usize = 12;
const DIR_FIELD_LEN_MAX: usize = 9999;
const MAX_RECORD_LEN: usize = 99999;

/// Parses a binary MARC byte stream and emits [`Record`] values.
///
/// Records are delimited by the record terminator, so a record whose
/// body fails to decode is reported as an `Err` element without
/// derailing the iterator; scanning resumes at the next terminator.
pub struct BinaryRecordIterator<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> BinaryRecordIterator<R> {
    pub fn new(source: R) -> Self {
        BinaryRecordIterator {
            reader: BufReader::new(source),
        }
    }
}

impl<R: Read> Iterator for BinaryRecordIterator<R> {
    type Item = Result<Record, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut bytes: Vec<u8> = Vec::new();

        match self.reader.read_until(END_OF_RECORD, &mut bytes) {
            Ok(0) => None, // EOF
            Ok(_) => {
                // Tolerate stray trailing whitespace after the final record.
                if bytes.iter().all(|b| b.is_ascii_whitespace()) {
                    None
                } else {
                    Some(Record::from_binary(&bytes))
                }
            }
            Err(e) => Some(Err(format!("Error reading MARC data: {e}"))),
        }
    }
}

/// Parse `digits` chars of ASCII-encoded decimal starting at `offset`.
fn decimal_at(bytes: &[u8], offset: usize, digits: usize) -> Result<usize, String> {
    let chunk = bytes
        .get(offset..offset + digits)
        .ok_or_else(|| format!("Record truncated at offset {offset}"))?;

    let s = std::str::from_utf8(chunk)
        .map_err(|e| format!("Expected ASCII digits at offset {offset}: {e}"))?;

    s.parse::<usize>()
        .map_err(|e| format!("Invalid decimal value '{s}' at offset {offset}: {e}"))
}

impl Record {
    /// Returns an iterator over MARC records pulled from a byte stream,
    /// e.g. an open file or an in-memory buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use marcrec::Record;
    ///
    /// let bytes =
    ///     "00059       00037       245002100000\x1E  \x1FaMy favorite book\x1E\x1D".as_bytes();
    ///
    /// let mut iter = Record::from_binary_stream(bytes);
    /// let record = iter.next().unwrap().unwrap();
    ///
    /// assert_eq!(record.get_field_values("245", "a"), vec!["My favorite book"]);
    /// assert!(iter.next().is_none());
    /// ```
    pub fn from_binary_stream<R: Read>(source: R) -> BinaryRecordIterator<R> {
        BinaryRecordIterator::new(source)
    }

    /// Creates a single MARC Record from its binary encoding.
    ///
    /// # References
    ///
    /// * <https://www.loc.gov/marc/bibliographic/bdleader.html>
    /// * <https://www.loc.gov/marc/bibliographic/bddirectory.html>
    pub fn from_binary(bytes: &[u8]) -> Result<Record, String> {
        if bytes.len() < LEADER_LEN {
            return Err(format!("Binary record is too short: {} bytes", bytes.len()));
        }

        let reported_len = decimal_at(bytes, 0, RECORD_LEN_DIGITS)?;

        if reported_len != bytes.len() {
            return Err(format!(
                "Record length mismatch: reported={} actual={}",
                reported_len,
                bytes.len()
            ));
        }

        // Where the control/data field content begins.
        let base_address = decimal_at(bytes, BASE_ADDRESS_OFFSET, BASE_ADDRESS_DIGITS)?;

        if base_address <= LEADER_LEN || base_address > bytes.len() {
            return Err(format!("Invalid base address {base_address}"));
        }

        let mut record = Record::new();
        record.set_leader_bytes(&bytes[..LEADER_LEN])?;

        // The directory sits between the leader and the base address,
        // closed with a field terminator.
        let directory = &bytes[LEADER_LEN..base_address - 1];

        if directory.is_empty() || directory.len() % DIR_ENTRY_LEN != 0 {
            return Err(format!("Invalid directory length {}", directory.len()));
        }

        for entry in directory.chunks_exact(DIR_ENTRY_LEN) {
            record.unpack_field(entry, base_address, bytes)?;
        }

        Ok(record)
    }

    /// Decode the field described by one directory entry and append it,
    /// preserving directory order.
    fn unpack_field(
        &mut self,
        entry: &[u8],
        base_address: usize,
        bytes: &[u8],
    ) -> Result<(), String> {
        let tag = std::str::from_utf8(&entry[..3])
            .map_err(|e| format!("Directory entry has invalid tag bytes: {e}"))?;

        let field_len = decimal_at(entry, 3, 4)
            .map_err(|e| format!("Bad directory entry for tag={tag}: {e}"))?;

        let field_start = decimal_at(entry, 7, 5)
            .map_err(|e| format!("Bad directory entry for tag={tag}: {e}"))?;

        if field_len == 0 {
            return Err(format!("Zero-length field for tag={tag}"));
        }

        let start = base_address + field_start;
        let end = start + field_len - 1; // drop the field terminator

        if end > bytes.len() || start > end {
            return Err(format!("Field overruns record for tag={tag}"));
        }

        let content = std::str::from_utf8(&bytes[start..end])
            .map_err(|e| format!("Field data for tag={tag} is not UTF-8: {e}"))?;

        if tag < "010" {
            self.control_fields_mut()
                .push(Controlfield::new(tag, content)?);
            return Ok(());
        }

        // Data field content is ind1 + ind2 + delimited subfields.
        let inds = content
            .get(..2)
            .ok_or_else(|| format!("Data field too short for tag={tag}"))?;

        let mut field = Field::new(tag)?;

        // Blank indicators are the default; only store explicit values.
        if &inds[..1] != " " {
            field.set_ind1(&inds[..1])?;
        }
        if &inds[1..2] != " " {
            field.set_ind2(&inds[1..2])?;
        }

        let mut parts = content[2..].split(SUBFIELD_DELIMITER as char);
        parts.next(); // leading chunk before the first delimiter

        for part in parts {
            let code = part
                .get(..1)
                .ok_or_else(|| format!("Invalid subfield code in tag={tag}"))?;
            field
                .subfields_mut()
                .push(Subfield::new(code, part.get(1..).unwrap_or(""))?);
        }

        self.fields_mut().push(field);

        Ok(())
    }

    /// Generates the binary form of a MARC record as a vector of bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use marcrec::Record;
    /// let mut record = Record::new();
    /// record
    ///     .add_data_field("245")
    ///     .unwrap()
    ///     .add_subfield("a", "My favorite book")
    ///     .unwrap();
    /// assert_eq!(
    ///     record.to_binary().unwrap(),
    ///     "00059       00037       245002100000\x1E  \x1FaMy favorite book\x1E\x1D".as_bytes()
    /// );
    /// ```
    pub fn to_binary(&self) -> Result<Vec<u8>, String> {
        let mut directory: Vec<u8> = Vec::new();
        let mut body: Vec<u8> = Vec::new();

        for cf in self.control_fields() {
            let start = body.len();
            body.extend_from_slice(cf.content().as_bytes());
            body.push(END_OF_FIELD);
            directory_entry(&mut directory, cf.tag(), body.len() - start, start)?;
        }

        for field in self.fields() {
            let start = body.len();
            body.extend_from_slice(field.ind1().as_bytes());
            body.extend_from_slice(field.ind2().as_bytes());

            for sf in field.subfields() {
                body.push(SUBFIELD_DELIMITER);
                body.extend_from_slice(sf.code().as_bytes());
                body.extend_from_slice(sf.content().as_bytes());
            }

            body.push(END_OF_FIELD);
            directory_entry(&mut directory, field.tag(), body.len() - start, start)?;
        }

        directory.push(END_OF_FIELD);

        let base_address = LEADER_LEN + directory.len();
        let total_len = base_address + body.len() + 1; // record terminator

        if total_len > MAX_RECORD_LEN {
            return Err(format!(
                "MARC byte count {total_len} too large for binary encoding"
            ));
        }

        let mut bytes = Vec::with_capacity(total_len);
        bytes.extend_from_slice(self.leader().as_bytes());
        bytes.append(&mut directory);
        bytes.append(&mut body);
        bytes.push(END_OF_RECORD);

        // Sync the leader with the record length and base address
        // of the encoding just produced.
        bytes[..RECORD_LEN_DIGITS].copy_from_slice(format!("{total_len:05}").as_bytes());

        bytes[BASE_ADDRESS_OFFSET..BASE_ADDRESS_OFFSET + BASE_ADDRESS_DIGITS]
            .copy_from_slice(format!("{base_address:05}").as_bytes());

        Ok(bytes)
    }
}

/// Append one 12-byte directory entry: tag, field length, field offset.
fn directory_entry(
    directory: &mut Vec<u8>,
    tag: &str,
    field_len: usize,
    field_start: usize,
) -> Result<(), String> {
    if field_len > DIR_FIELD_LEN_MAX {
        return Err(format!(
            "Field too large for binary encoding tag={tag} len={field_len}"
        ));
    }

    directory.extend_from_slice(format!("{tag}{field_len:04}{field_start:05}").as_bytes());

    Ok(())
}
