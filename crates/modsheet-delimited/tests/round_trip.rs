use modsheet_delimited::{
    decode, detect_encoding, encode_for_output, parse, read_table, serialize, TextEncoding,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn field() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just(",".to_string()),
            Just("\"".to_string()),
            Just("\r\n".to_string()),
            Just(";".to_string()),
            "[a-zA-Z0-9 é£]{0,3}",
        ],
        0..5,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn serialize_then_parse_reconstructs_fields(
        width in 2usize..5,
        body in prop::collection::vec(prop::collection::vec(field(), 5), 0..6),
        delimiter in prop::sample::select(vec![',', '\t', ';', '|']),
    ) {
        let headers: Vec<String> = (0..width).map(|i| format!("h{i}")).collect();
        let records: Vec<Vec<String>> = body
            .into_iter()
            .map(|mut r| {
                r.truncate(width);
                r
            })
            .collect();

        let text = serialize(&headers, &records, delimiter);
        let parsed = parse(&text, delimiter);

        let mut expected = vec![headers];
        expected.extend(records);
        prop_assert_eq!(parsed, expected);
    }
}

#[test]
fn encoding_round_trip() {
    let samples = [
        ("ascii", "Username,Mark\r\njd1,55"),
        ("latin", "Nom;Note\r\nJosé Müller;17,5\r\nŁukasz;£12"),
        ("cjk", "姓名\t分数\r\n张三\t88"),
    ];
    for source in [
        TextEncoding::Utf8,
        TextEncoding::Windows1252,
        TextEncoding::Utf16Le,
        TextEncoding::Utf16Be,
    ] {
        for (label, text) in samples {
            let bytes = encode_for_output(text, source);
            let detected = detect_encoding(&bytes);
            assert_eq!(detected.is_utf16(), source.is_utf16(), "{label} from {source}");
            assert_eq!(decode(&bytes, detected), text, "{label} from {source}");
        }
    }
}

#[test]
fn utf16be_export_is_written_back_as_utf16le() {
    let text = "Username,Mark\r\njd1,\"1,5\"\r\n";
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));

    let mut table = read_table(&bytes);
    assert_eq!(table.encoding(), TextEncoding::Utf16Be);
    assert_eq!(table.get(0, 1), Some("1,5"));
    assert!(table.set(0, 1, "62"));

    let out = table.to_bytes();
    assert_eq!(&out[..2], &[0xFF, 0xFE]);
    assert_eq!(decode(&out, detect_encoding(&out)), "Username,Mark\r\njd1,62");
}

#[test]
fn windows_1252_export_is_written_back_as_utf8() {
    let bytes = b"Username;Name\r\njd1;Jos\xe9\r\n";
    let table = read_table(bytes);
    assert_eq!(table.encoding(), TextEncoding::Windows1252);
    assert_eq!(table.delimiter(), ';');
    assert_eq!(table.get(0, 1), Some("José"));

    let out = table.to_bytes();
    assert_eq!(&out[..3], &[0xEF, 0xBB, 0xBF]);
    assert_eq!(&out[3..], "Username;Name\r\njd1;José".as_bytes());
}

#[test]
fn mixed_delimiter_first_line_picks_comma() {
    let table = read_table(b"a,b;c,d\r\n1,2;3,4");
    assert_eq!(table.delimiter(), ',');
    assert_eq!(table.headers(), ["a", "b;c", "d"]);
    assert_eq!(table.records(), [vec!["1".to_string(), "2;3".into(), "4".into()]]);
}
