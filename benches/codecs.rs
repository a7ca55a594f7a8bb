use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use valuestream::tree::convert;
use valuestream::{
    from_binn, from_bson, from_cbor, from_csv, from_json, from_message_pack, from_ubjson, json,
    msgpack, to_binn, to_bson, to_cbor, to_csv, to_json, to_message_pack, to_ubjson, value,
    Limits, Value,
};

fn products(count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            value!({
                "sku": (format!("SKU{}", i)),
                "name": (format!("Product {}", i)),
                "price": (9.99 + i as f64),
                "quantity": i,
                "active": (i % 3 != 0)
            })
        })
        .collect();
    value!({"store": "main", "products": (Value::from(items))})
}

fn benchmark_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for size in [10, 100, 1000] {
        let v = products(size);
        group.bench_with_input(BenchmarkId::new("json", size), &v, |b, v| {
            b.iter(|| to_json(black_box(v)))
        });
        group.bench_with_input(BenchmarkId::new("msgpack", size), &v, |b, v| {
            b.iter(|| to_message_pack(black_box(v)))
        });
        group.bench_with_input(BenchmarkId::new("cbor", size), &v, |b, v| {
            b.iter(|| to_cbor(black_box(v)))
        });
        group.bench_with_input(BenchmarkId::new("ubjson", size), &v, |b, v| {
            b.iter(|| to_ubjson(black_box(v)))
        });
        group.bench_with_input(BenchmarkId::new("binn", size), &v, |b, v| {
            b.iter(|| to_binn(black_box(v)))
        });
        group.bench_with_input(BenchmarkId::new("bson", size), &v, |b, v| {
            b.iter(|| to_bson(black_box(v)))
        });
    }
    group.finish();
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for size in [10, 100, 1000] {
        let v = products(size);
        let text = to_json(&v).unwrap();
        group.bench_with_input(BenchmarkId::new("json", size), &text, |b, text| {
            b.iter(|| from_json(black_box(text)))
        });

        let binary: [(&str, Vec<u8>, fn(&[u8]) -> valuestream::Result<Value>); 5] = [
            ("msgpack", to_message_pack(&v).unwrap(), from_message_pack),
            ("cbor", to_cbor(&v).unwrap(), from_cbor),
            ("ubjson", to_ubjson(&v).unwrap(), from_ubjson),
            ("binn", to_binn(&v).unwrap(), from_binn),
            ("bson", to_bson(&v).unwrap(), from_bson),
        ];
        for (name, bytes, parse) in binary {
            group.bench_with_input(BenchmarkId::new(name, size), &bytes, |b, bytes| {
                b.iter(|| parse(black_box(bytes)))
            });
        }
    }
    group.finish();
}

fn benchmark_csv(c: &mut Criterion) {
    let rows: Vec<Value> = (0..500)
        .map(|i| value!([(format!("SKU{}", i)), (9.99 + i as f64), i, "in \"stock\""]))
        .collect();
    let table = Value::from(rows);
    let text = to_csv(&table).unwrap();

    c.bench_function("csv_encode_500_rows", |b| b.iter(|| to_csv(black_box(&table))));
    c.bench_function("csv_decode_500_rows", |b| b.iter(|| from_csv(black_box(&text))));
}

fn benchmark_convert(c: &mut Criterion) {
    let text = to_json(&products(100)).unwrap();
    c.bench_function("convert_json_to_msgpack", |b| {
        b.iter(|| {
            let mut parser = json::Parser::new(black_box(&text));
            convert(&mut parser, msgpack::Writer::new(Vec::new()), &Limits::default())
                .map(msgpack::Writer::into_inner)
        })
    });
}

criterion_group!(
    benches,
    benchmark_encode,
    benchmark_decode,
    benchmark_csv,
    benchmark_convert
);
criterion_main!(benches);
