use encoding_rs::WINDOWS_1252;
use partnerdesk_core::{decode, prepare, DatasetKind, DecodeError, DecodeProfile, TextEncoding};

const CONTACTS: &str = "Account Name,Account Owner,City\nCafé Noir,Renée,Köln\n";
const ROLODEX: &str = "Partner\tRegion\n=HYPERLINK(\"https://docs.test/p\";\"Pâtisserie\")\tEMEA\n";

fn encode(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
        TextEncoding::Utf16 => {
            let mut bytes = vec![0xFF, 0xFE];
            for unit in text.encode_utf16() {
                bytes.extend_from_slice(&unit.to_le_bytes());
            }
            bytes
        }
        TextEncoding::Latin1 | TextEncoding::Iso8859_1 => {
            text.chars().map(|c| u8::try_from(c as u32).unwrap()).collect()
        }
        TextEncoding::Cp1252 => {
            let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
            assert!(!had_errors);
            bytes.into_owned()
        }
    }
}

#[test]
fn comma_profile_reads_every_candidate_encoding() {
    let profile = DecodeProfile::comma();
    for candidate in profile.candidates() {
        let bytes = encode(CONTACTS, candidate.encoding);
        let dataset = decode(&bytes, &profile)
            .unwrap_or_else(|err| panic!("{} failed: {err}", candidate.encoding));
        assert_eq!(
            dataset.column_names(),
            vec!["Account Name", "Account Owner", "City"],
            "{}",
            candidate.encoding
        );
        assert_eq!(dataset.row_count(), 1);
    }
}

#[test]
fn tab_profile_reads_every_candidate_encoding() {
    let profile = DecodeProfile::tab();
    for candidate in profile.candidates() {
        let bytes = encode(ROLODEX, candidate.encoding);
        let dataset = decode(&bytes, &profile)
            .unwrap_or_else(|err| panic!("{} failed: {err}", candidate.encoding));
        assert_eq!(dataset.column_names(), vec!["Partner", "Region"]);
    }
}

#[test]
fn unparseable_input_lists_every_attempt() {
    let profile = DecodeProfile::tab();
    let err = decode(b"a\tb\n1\t2\t3\t4\n", &profile).unwrap_err();
    match &err {
        DecodeError::Exhausted { attempted } => {
            let tried: Vec<_> = attempted.iter().map(|r| r.candidate).collect();
            assert_eq!(tried, profile.candidates().to_vec());
            assert!(attempted[0].reason.contains("byte-order mark"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn rolodex_upload_is_split_and_serialized() {
    let prepared = prepare(DatasetKind::Rolodex, &encode(ROLODEX, TextEncoding::Utf16)).unwrap();
    assert_eq!(prepared.columns, vec!["Partner", "Documentation Link", "Region"]);
    assert_eq!(
        String::from_utf8(prepared.csv).unwrap(),
        "Partner,Documentation Link,Region\nPâtisserie,https://docs.test/p,EMEA\n"
    );
}
