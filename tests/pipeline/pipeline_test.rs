#[cfg(test)]
mod tests {
    use flatsheet::aggregate::Measure;
    use flatsheet::config::Settings;
    use flatsheet::flatten::ColumnMapping;
    use flatsheet::sink::{file_sink, CsvSink, JsonSink, OutputFormat};
    use flatsheet::source::{MemorySource, RetryPolicy};
    use flatsheet::transform::Transform;
    use flatsheet::Job;
    use insta::assert_snapshot;
    use std::fs;
    use std::path::PathBuf;

    const SALE_ORDERS: &str = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "result": {
            "length": 2,
            "records": [
                {
                    "name": "SO001",
                    "date_order": "2024-03-05 09:12:44",
                    "partner_id": [7, "Acme Garments"],
                    "buyer_name": {"id": 3, "display_name": "Jane", "brand": "North"},
                    "invoice_ids": [
                        {"id": 9, "name": "INV/002"},
                        {"id": 8, "name": "INV/001"},
                        {"id": 10, "name": "INV/002"}
                    ],
                    "order_line": [
                        {"product_id": [11, "Zipper #5"], "product_uom_qty": 2, "price_unit": 1.5},
                        {"product_id": [11, "Zipper #5"], "product_uom_qty": 3, "price_unit": 2.5},
                        {"product_id": [12, "Slider"], "product_uom_qty": 10, "price_unit": 0.2}
                    ]
                },
                {
                    "name": "SO002",
                    "date_order": "2024-03-06 14:00:00",
                    "partner_id": false,
                    "buyer_name": false,
                    "invoice_ids": [],
                    "order_line": []
                }
            ]
        }
    }"#;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("flatsheet-test-{}", std::process::id()))
            .join(name)
    }

    fn dispatch_job() -> Job {
        let mapping = ColumnMapping::new()
            .field("Order", "name")
            .field("Date", "date_order")
            .field("Customer", "partner_id")
            .nested("Brand", "buyer_name", "brand")
            .joined("Invoices", "invoice_ids", Some("name"))
            .field("Item", "product_id")
            .field("Qty", "product_uom_qty")
            .field("Final Price", "price_unit")
            .fan_out(["order_line"]);

        Job::new("fg_dispatch", mapping)
            .with_transform(Transform::DateOnly("Date".to_string()))
            .with_transform(Transform::Product {
                column: "Value".to_string(),
                factors: vec!["Final Price".to_string(), "Qty".to_string()],
            })
            .with_measure("Qty", Measure::Sum)
            .with_measure("Final Price", Measure::Mean)
            .with_measure("Value", Measure::Sum)
            .with_page_size(1)
            .with_retry(RetryPolicy::once())
    }

    #[test]
    fn test_dispatch_to_csv() {
        let mut source = MemorySource::from_json_str(SALE_ORDERS).unwrap();
        let mut sink = CsvSink::new(Vec::new());

        let report = dispatch_job().run(&mut source, &mut sink).unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.flattened, 4);
        assert_eq!(report.written, 3);

        let csv = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_snapshot!(csv.trim_end(), @r###"
        Order,Date,Customer,Brand,Invoices,Item,Qty,Final Price,Value
        SO001,2024-03-05,Acme Garments,North,"INV/001, INV/002",Zipper #5,5,2,10.5
        SO001,2024-03-05,Acme Garments,North,"INV/001, INV/002",Slider,10,0.2,2
        SO002,2024-03-06,,,,,0,0,0
        "###);
    }

    #[test]
    fn test_dispatch_to_json() {
        let mut source = MemorySource::from_json_str(SALE_ORDERS).unwrap();
        let mut sink = JsonSink::new(Vec::new()).compact();

        dispatch_job().run(&mut source, &mut sink).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Item"], "Zipper #5");
        assert_eq!(rows[0]["Qty"], 5);
        assert_eq!(rows[2]["Order"], "SO002");
        assert_eq!(rows[2]["Customer"], "");
    }

    #[test]
    fn test_settings_job_writes_file() {
        let dir = temp_path("settings_job");
        let input = dir.join("orders.json");
        let output = dir.join("out").join("items.csv");
        fs::create_dir_all(&dir).unwrap();
        fs::write(&input, SALE_ORDERS).unwrap();

        let settings = Settings::from_toml(&format!(
            r#"
[retry]
attempts = 1
delay_secs = 0

[report]
utc_offset = "+06:00"

[jobs.oa_item]
input = "{input}"
output = "{output}"
fan_out = ["order_line"]
infer_measures = true

[[jobs.oa_item.columns]]
name = "Order Reference"
field = "name"

[[jobs.oa_item.columns]]
name = "Product"
field = "product_id"

[[jobs.oa_item.columns]]
name = "Quantity"
field = "product_uom_qty"
"#,
            input = input.display(),
            output = output.display()
        ))
        .unwrap();

        let job_settings = settings.get_job("oa_item").unwrap();
        let job = Job::from_settings(&settings, "oa_item").unwrap();
        let mut source = MemorySource::from_path(job_settings.input.as_ref().unwrap()).unwrap();
        let mut sink = file_sink(job_settings.output.as_ref().unwrap(), OutputFormat::Csv).unwrap();

        let report = job.run(&mut source, sink.as_mut()).unwrap();
        drop(sink);
        assert_eq!(report.written, 3);
        let finished = report.finished_at.unwrap();
        assert_eq!(finished.offset().local_minus_utc(), 6 * 3600);
        assert!(report.last_updated().unwrap().starts_with("Last Updated: "));

        let written = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines,
            [
                "Order Reference,Product,Quantity",
                "SO001,Zipper #5,5",
                "SO001,Slider,10",
                "SO002,,0",
            ]
        );

        fs::remove_dir_all(&dir).ok();
    }
}
