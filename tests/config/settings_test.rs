#[cfg(test)]
mod tests {
    use flatsheet::aggregate::Measure;
    use flatsheet::config::{Settings, SettingsError};
    use flatsheet::sink::OutputFormat;
    use flatsheet::transform::Transform;
    use std::fs;
    use std::path::PathBuf;

    const JOBS: &str = r#"
[source]
endpoint = "${FLATSHEET_IT_ENDPOINT}"
database = "erp"
username = "reports@example.com"
password = "$FLATSHEET_IT_PASSWORD"

[jobs.oa_item]
output = "out/oa_item.csv"
fan_out = ["order_line"]
infer_measures = true

[[jobs.oa_item.columns]]
name = "Order Reference"
field = "name"

[[jobs.oa_item.columns]]
name = "Quantity"
field = "product_uom_qty"

[jobs.fg_dispatch]
format = "json"
fan_out = ["order_line"]

[jobs.fg_dispatch.measures]
"Qty" = "sum"
"Final Price" = "avg"
"Value" = "sum"

[[jobs.fg_dispatch.columns]]
name = "Order Date"
field = "date_order"

[[jobs.fg_dispatch.columns]]
name = "Qty"
field = "qty_delivered"

[[jobs.fg_dispatch.columns]]
name = "Final Price"
field = "price_unit"

[[jobs.fg_dispatch.columns]]
name = "Invoice Status"
field = "invoice_ids"
subfield = "payment_state"
join = true

[[jobs.fg_dispatch.transforms]]
date_only = "Order Date"

[[jobs.fg_dispatch.transforms]]
product = { column = "Value", factors = ["Final Price", "Qty"] }
"#;

    #[test]
    fn test_parse_jobs() {
        let settings = Settings::from_toml(JOBS).unwrap();

        let names: Vec<&str> = settings.jobs.keys().map(String::as_str).collect();
        assert_eq!(names, ["fg_dispatch", "oa_item"]);

        let oa = settings.get_job("oa_item").unwrap();
        assert_eq!(oa.format, OutputFormat::Csv);
        assert_eq!(oa.output, Some(PathBuf::from("out/oa_item.csv")));
        assert!(oa.infer_measures);
        assert!(oa.measures.is_empty());

        let fg = settings.get_job("fg_dispatch").unwrap();
        assert_eq!(fg.format, OutputFormat::Json);
        assert_eq!(fg.measures.get("Final Price"), Some(&Measure::Mean));
        assert_eq!(
            fg.transforms,
            vec![
                Transform::DateOnly("Order Date".to_string()),
                Transform::Product {
                    column: "Value".to_string(),
                    factors: vec!["Final Price".to_string(), "Qty".to_string()],
                },
            ]
        );
        assert!(fg.columns[3].join);
        assert_eq!(fg.columns[3].subfield.as_deref(), Some("payment_state"));

        let mapping = fg.mapping();
        let columns: Vec<&str> = mapping.names().collect();
        assert_eq!(columns, ["Order Date", "Qty", "Final Price", "Invoice Status"]);
    }

    #[test]
    fn test_connection_values_expand() {
        std::env::set_var("FLATSHEET_IT_ENDPOINT", "https://erp.example.com");
        std::env::set_var("FLATSHEET_IT_PASSWORD", "s3cret");

        let settings = Settings::from_toml(JOBS).unwrap();
        let source = settings.source.resolved().unwrap();
        assert_eq!(source.endpoint.as_deref(), Some("https://erp.example.com"));
        assert_eq!(source.password.as_deref(), Some("s3cret"));
        assert_eq!(source.database.as_deref(), Some("erp"));
        assert_eq!(source.username.as_deref(), Some("reports@example.com"));

        std::env::remove_var("FLATSHEET_IT_ENDPOINT");
        std::env::remove_var("FLATSHEET_IT_PASSWORD");
    }

    #[test]
    fn test_invalid_job_rejected() {
        let toml = r#"
[jobs.broken]
measures = { Missing = "sum" }

[[jobs.broken.columns]]
name = "Qty"
field = "qty"
"#;
        match Settings::from_toml(toml) {
            Err(SettingsError::InvalidConfig(message)) => {
                assert!(message.contains("broken"), "message: {}", message);
                assert!(message.contains("Missing"), "message: {}", message);
            }
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_measure_name_is_parse_error() {
        let toml = r#"
[jobs.bad]
measures = { Qty = "median" }

[[jobs.bad.columns]]
name = "Qty"
field = "qty"
"#;
        assert!(matches!(
            Settings::from_toml(toml),
            Err(SettingsError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = std::env::temp_dir().join(format!("flatsheet-settings-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("flatsheet.toml");
        fs::write(&path, JOBS).unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.jobs.len(), 2);
        assert_eq!(settings.source.page_size, 2000);

        assert!(matches!(
            Settings::from_file(dir.join("absent.toml")),
            Err(SettingsError::FileNotFound(_))
        ));

        fs::remove_dir_all(&dir).ok();
    }
}
