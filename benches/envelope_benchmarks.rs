use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dmq_core::messaging::{AesGcmCipher, EncryptionPolicy, FieldType, Message, MessageDefinition};
use dmq_core::utils::canonical::content_hash;
use serde_json::{json, Value};

fn payload() -> Value {
    json!({
        "orderId": "o-1",
        "customer": {"id": "c-9", "name": "Ada", "tier": "gold"},
        "lines": [
            {"sku": "A-1", "qty": 2, "price": 9.5},
            {"sku": "B-7", "qty": 1, "price": 120.0}
        ],
        "total": 139.0
    })
}

fn definition() -> Arc<MessageDefinition> {
    Arc::new(
        MessageDefinition::event("com.acme.order.created", "1")
            .with_encryption(EncryptionPolicy::fields([("customer", FieldType::Object)])),
    )
}

fn benchmark_seal(c: &mut Criterion) {
    let definition = definition();
    c.bench_function("envelope_seal", |b| {
        b.iter(|| {
            let mut message =
                Message::build(definition.clone(), "tenant-1", "bench", payload(), None).unwrap();
            message.seal().unwrap();
            black_box(message)
        })
    });
}

fn benchmark_verify(c: &mut Criterion) {
    let mut message = Message::build(definition(), "tenant-1", "bench", payload(), None).unwrap();
    message.seal().unwrap();
    c.bench_function("envelope_verify", |b| b.iter(|| black_box(message.verify())));
}

fn benchmark_content_hash(c: &mut Criterion) {
    let value = payload();
    c.bench_function("content_hash", |b| {
        b.iter(|| content_hash(black_box(&value)).unwrap())
    });
}

fn benchmark_field_encryption(c: &mut Criterion) {
    let cipher = AesGcmCipher::new();
    let key = AesGcmCipher::generate_key();
    let message = Message::build(definition(), "tenant-1", "bench", payload(), None).unwrap();
    c.bench_function("field_encrypt", |b| {
        b.iter(|| {
            let mut copy = message.clone();
            copy.encrypt(&cipher, "vault-1", &key).unwrap();
            black_box(copy)
        })
    });
}

criterion_group!(
    benches,
    benchmark_seal,
    benchmark_verify,
    benchmark_content_hash,
    benchmark_field_encryption
);
criterion_main!(benches);
