#![allow(dead_code)]

use bson::oid::ObjectId;
use bson::{DateTime, Decimal128, RawDocumentBuf, Timestamp};
use sieve_codec::{Document, Value};
use sieve_engine::{Filter, Projection, Projector};

/// Route engine logs to the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

/// Decimal128 with the given coefficient and exponent.
pub fn decimal(coefficient: u64, exponent: i32) -> Decimal128 {
    let biased = (exponent + 6176) as u128;
    let bits = (biased << 113) | coefficient as u128;
    Decimal128::from_bytes(bits.to_le_bytes())
}

pub fn oid(hex: &str) -> ObjectId {
    ObjectId::parse_str(hex).unwrap()
}

pub fn array<const N: usize>(items: [Value; N]) -> Value {
    Value::Array(items.into())
}

pub fn encode(doc: &Document) -> Vec<u8> {
    doc.to_bytes().unwrap()
}

/// Raw element bytes: tag, cstring name, payload.
pub fn element(tag: u8, name: &str, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![tag];
    bytes.extend_from_slice(name.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(payload);
    bytes
}

/// Length prefix and terminator around encoded elements. Used for inputs
/// `rawdoc!` cannot express, such as arrays with arbitrary keys.
pub fn framed(elements: &[u8]) -> Vec<u8> {
    let len = (elements.len() + 5) as i32;
    let mut bytes = len.to_le_bytes().to_vec();
    bytes.extend_from_slice(elements);
    bytes.push(0);
    bytes
}

/// Decode into a `RawDocumentBuf` so failures print as documents.
pub fn raw(bytes: Vec<u8>) -> RawDocumentBuf {
    RawDocumentBuf::from_bytes(bytes).unwrap()
}

pub fn project(input: &[u8], projection: &Projection) -> RawDocumentBuf {
    let out = Projector::new()
        .project(input, Some(projection), None)
        .unwrap()
        .unwrap();
    raw(out)
}

pub fn include(input: &[u8], paths: &[&str]) -> RawDocumentBuf {
    project(input, &Projection::inclusive(paths).unwrap())
}

pub fn exclude(input: &[u8], paths: &[&str]) -> RawDocumentBuf {
    project(input, &Projection::exclusive(paths).unwrap())
}

/// Run `filter` with a throwaway projection; true when the document is kept.
pub fn keeps(input: &[u8], filter: RawDocumentBuf) -> bool {
    let filter = Filter::parse(&filter).unwrap();
    let projection = Projection::inclusive(["docId"]).unwrap();
    Projector::new()
        .project(input, Some(&projection), Some(&filter))
        .unwrap()
        .is_some()
}

/// One field of every BSON type plus nested documents and arrays.
pub fn catalog() -> Document {
    Document::new()
        .with("_id", Value::ObjectId(oid("65fd79d47b59e42e191daab1")))
        .with("name", "Comprehensive BSON Test")
        .with("level", 100_i32)
        .with("isPublished", true)
        .with("rating", 4.8)
        .with("version", 123_456_789_012_345_i64)
        .with("price", Value::Decimal128(decimal(19999, -2)))
        .with(
            "author",
            Document::new()
                .with("name", "Eason")
                .with("email", "eason@example.com")
                .with(
                    "address",
                    Document::new().with("city", "Cyber City").with("zip", "90210"),
                ),
        )
        .with(
            "tags",
            array(["bson".into(), "java".into(), "mongodb".into(), "test".into()]),
        )
        .with(
            "history",
            array([
                Document::new()
                    .with("version", 1_i32)
                    .with("action", "created")
                    .with("details", Document::new().with("by", "user1"))
                    .into(),
                Document::new()
                    .with("version", 2_i32)
                    .with("action", "updated")
                    .with("status", "approved")
                    .into(),
                Document::new()
                    .with("version", 3_i32)
                    .with("action", "reviewed")
                    .into(),
            ]),
        )
        .with(
            "binaryData",
            Value::Binary {
                subtype: 0,
                bytes: vec![0, 1, 2, 3, 4, 5, 6, 7],
            },
        )
        .with("creationDate", Value::DateTime(DateTime::from_millis(1_758_364_200_000)))
        .with(
            "lastModified",
            Value::Timestamp(Timestamp {
                time: 1_758_400_200,
                increment: 1,
            }),
        )
        .with(
            "regex",
            Value::Regex {
                pattern: "^test".into(),
                options: "i".into(),
            },
        )
        .with(
            "dbPointer",
            Value::DbPointer {
                namespace: "users.prod".into(),
                id: oid("65fd79d47b59e42e191daab2"),
            },
        )
        .with(
            "jsCodeWithScope",
            Value::JavaScriptWithScope {
                code: "function() { return x; }".into(),
                scope: Document::new().with("x", 1_i32),
            },
        )
        .with("symbol", Value::Symbol("mySymbol".into()))
        .with(
            "metadata",
            Document::new()
                .with("nullableField", Value::Null)
                .with("undefinedField", Value::Undefined)
                .with("minKeyField", Value::MinKey)
                .with("maxKeyField", Value::MaxKey)
                .with(
                    "extra",
                    Document::new().with(
                        "level3",
                        Document::new().with("value", "deeply nested value"),
                    ),
                ),
        )
}

/// Flat-ish record used by the filter tests.
pub fn inventory() -> Document {
    let item = |id: &str, price: f64, stock: i32, maker: &str, colors: [&str; 2]| -> Value {
        Document::new()
            .with("itemId", id)
            .with("price", price)
            .with("stock", stock)
            .with(
                "details",
                Document::new()
                    .with("manufacturer", maker)
                    .with("colors", array([colors[0].into(), colors[1].into()])),
            )
            .into()
    };
    Document::new()
        .with("docId", "doc-1")
        .with("_id", Value::ObjectId(oid("6514213e8a48af317e3e622a")))
        .with("doubleValue", 123.456)
        .with("stringValue", "hello world")
        .with("intValue", 100_i32)
        .with("longValue", 9_876_543_210_i64)
        .with("decimalValue", Value::Decimal128(decimal(123_456_789, -4)))
        .with("booleanValue", true)
        .with("nullValue", Value::Null)
        .with("dateValue", Value::DateTime(DateTime::from_millis(1_698_400_800_000)))
        .with(
            "binaryData",
            Value::Binary {
                subtype: 0,
                bytes: b"test".to_vec(),
            },
        )
        .with("regexStr", "abc123xyz")
        .with(
            "tags",
            array(["mongodb".into(), "java".into(), "bson".into()]),
        )
        .with(
            "nestedDoc",
            Document::new()
                .with("nestedString", "I am nested")
                .with("nestedInt", 50_i32)
                .with("nestedArray", array([10_i32.into(), 20_i32.into()])),
        )
        .with(
            "items",
            array([
                item("A", 19.99, 20, "ACME", ["red", "blue"]),
                item("B", 29.99, 15, "XYZ", ["green", "blue"]),
            ]),
        )
}
