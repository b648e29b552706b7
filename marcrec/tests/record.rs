use marcrec::Record;

// Avoiding newlines / formatting for testing purposes.
const MARC_BINARY: &str =
    "00059       00037       245002100000\x1E  \x1FaMy favorite book\x1E\x1D";

fn sample_record() -> Record {
    let mut record = Record::new();
    record.set_leader("00000cam a2200000 a 4500").unwrap();
    record.add_control_field("001", "ucla0000042").unwrap();
    record
        .add_control_field("008", "140128s2013    nyuopk")
        .unwrap();

    let field = record.add_data_field("035").unwrap();
    field.add_subfield("a", "(OCoLC)953985896").unwrap();
    field.add_subfield("9", "(ZTUCLA)813499").unwrap();

    let field = record.add_data_field("245").unwrap();
    field.set_ind1("1").unwrap();
    field.add_subfield("a", "Despierta con Cala /").unwrap();
    field.add_subfield("c", "Ismael Cala.").unwrap();

    let field = record.add_data_field("856").unwrap();
    field.set_ind1("4").unwrap();
    field.set_ind2("0").unwrap();
    field.add_subfield("u", "http://proquest.example.org/813499").unwrap();

    record
}

#[test]
fn known_binary_encoding() {
    let record = Record::from_binary(MARC_BINARY.as_bytes()).unwrap();

    assert_eq!(record.get_field_values("245", "a"), vec!["My favorite book"]);
    assert_eq!(record.to_binary().unwrap(), MARC_BINARY.as_bytes());
}

#[test]
fn binary_round_trip() {
    let binary1 = sample_record().to_binary().unwrap();

    let record2 = Record::from_binary(&binary1).unwrap();
    let binary2 = record2.to_binary().unwrap();

    assert_eq!(binary1, binary2);

    // Parsing identical bytes yields identical records.
    let record3 = Record::from_binary(&binary2).unwrap();
    assert_eq!(record2, record3);
}

#[test]
fn subfield_order_preserved() {
    let record = sample_record();
    let binary = record.to_binary().unwrap();
    let record = Record::from_binary(&binary).unwrap();

    let field = record.first_field("035").unwrap();
    assert_eq!(field.subfields()[0].code(), "a");
    assert_eq!(field.subfields()[1].code(), "9");
    assert_eq!(field.get_subfields("9").len(), 1);
}

#[test]
fn stream_parsing_multiple_records() {
    let mut bytes = sample_record().to_binary().unwrap();
    bytes.extend(MARC_BINARY.as_bytes());
    bytes.push(b'\n'); // trailing junk some producers emit

    let records: Vec<Record> = Record::from_binary_stream(bytes.as_slice())
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(records.len(), 2);
    assert_eq!(
        records[0].to_binary().unwrap(),
        sample_record().to_binary().unwrap()
    );
    assert_eq!(
        records[1].get_field_values("245", "a"),
        vec!["My favorite book"]
    );
}

#[test]
fn malformed_record_reported_without_derailing_stream() {
    let good = sample_record().to_binary().unwrap();

    let mut bytes = good.clone();
    bytes.extend(b"this is not a marc record\x1d");
    bytes.extend(&good);

    let results: Vec<Result<Record, String>> =
        Record::from_binary_stream(bytes.as_slice()).collect();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
}

#[test]
fn length_mismatch_rejected() {
    let mut bytes = sample_record().to_binary().unwrap();
    bytes.insert(bytes.len() - 2, b'x'); // grow the record without fixing the leader

    assert!(Record::from_binary(&bytes).is_err());
}
