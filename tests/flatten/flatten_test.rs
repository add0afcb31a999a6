#[cfg(test)]
mod tests {
    use flatsheet::flatten::{flatten, flatten_all, ColumnMapping, ExtractionRule, RuleError};
    use flatsheet::record::{Cell, RawRecord};
    use flatsheet::resolve::resolve;

    fn record(json: &str) -> RawRecord {
        serde_json::from_str(json).unwrap()
    }

    fn sale_order() -> RawRecord {
        record(
            r#"{
                "name": "SO001",
                "partner_id": [7, "Acme Garments"],
                "buyer_name": {"id": 3, "display_name": "Jane", "brand": "North"},
                "order_line": [
                    {"product_id": [11, "Zipper #5"], "qty": 2, "price": 10, "invoice_lines": [
                        {"move_name": "INV/001", "quantity": 2}
                    ]},
                    {"product_id": [12, "Slider"], "qty": 3, "price": 10, "invoice_lines": [
                        {"move_name": "INV/002", "quantity": 1},
                        {"move_name": "INV/003", "quantity": 2}
                    ]},
                    {"product_id": [13, "Puller"], "qty": 1, "price": 4.5, "invoice_lines": []}
                ]
            }"#,
        )
    }

    #[test]
    fn test_round_trip_two_lines() {
        let input = record(
            r#"{"name": "SO001", "order_line": [{"qty": 2, "price": 10}, {"qty": 3, "price": 10}]}"#,
        );
        let mapping = ColumnMapping::new()
            .field("Order", "name")
            .field("Qty", "qty")
            .field("Price", "price")
            .fan_out(["order_line"]);

        let rows = flatten(&input, &mapping);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Order"), Some(&Cell::text("SO001")));
        assert_eq!(rows[0].get("Qty"), Some(&Cell::Number(2.0)));
        assert_eq!(rows[0].get("Price"), Some(&Cell::Number(10.0)));
        assert_eq!(rows[1].get("Qty"), Some(&Cell::Number(3.0)));
        assert_eq!(rows[1].get("Price"), Some(&Cell::Number(10.0)));
    }

    #[test]
    fn test_fan_out_shares_parent_columns() {
        let mapping = ColumnMapping::new()
            .field("Order", "name")
            .field("Customer", "partner_id")
            .nested("Brand", "buyer_name", "brand")
            .field("Product", "product_id")
            .fan_out(["order_line"]);

        let rows = flatten(&sale_order(), &mapping);

        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.get("Order"), Some(&Cell::text("SO001")));
            assert_eq!(row.get("Customer"), Some(&Cell::text("Acme Garments")));
            assert_eq!(row.get("Brand"), Some(&Cell::text("North")));
        }
        let products: Vec<String> = rows
            .iter()
            .map(|row| row.get("Product").unwrap().to_string())
            .collect();
        assert_eq!(products, ["Zipper #5", "Slider", "Puller"]);
    }

    #[test]
    fn test_two_level_fan_out() {
        let mapping = ColumnMapping::new()
            .field("Order", "name")
            .field("Product", "product_id")
            .field("Invoice", "move_name")
            .field("Invoiced Qty", "quantity")
            .fan_out(["order_line", "invoice_lines"]);

        let rows = flatten(&sale_order(), &mapping);

        // 1 + 2 invoice lines, plus one row for the line with none
        assert_eq!(rows.len(), 4);
        let invoices: Vec<String> = rows
            .iter()
            .map(|row| row.get("Invoice").unwrap().to_string())
            .collect();
        assert_eq!(invoices, ["INV/001", "INV/002", "INV/003", ""]);
        assert_eq!(rows[3].get("Product"), Some(&Cell::text("Puller")));
        assert!(rows[3].get("Invoiced Qty").unwrap().is_empty());
    }

    #[test]
    fn test_shared_field_names_bound_to_levels() {
        let input = record(
            r#"{
                "name": "SO001",
                "price_total": 107,
                "order_line": [
                    {"name": "Zipper line", "price_total": 100, "invoice_lines": [
                        {"move_name": "INV/1", "price_total": 40},
                        {"move_name": "INV/2", "price_total": 60}
                    ]},
                    {"name": "Slider line", "price_total": 7, "invoice_lines": []}
                ]
            }"#,
        );
        let mapping = ColumnMapping::new()
            .field_at("Order Reference", "name", 0)
            .field_at("Total", "price_total", 1)
            .field_at("Invoice", "move_name", 2)
            .field_at("Invoice Total", "price_total", 2)
            .column("Order Total", ExtractionRule::field("price_total").at(0))
            .fan_out(["order_line", "invoice_lines"]);

        let rows = flatten(&input, &mapping);
        let text: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.values().map(|cell| cell.to_string()).collect())
            .collect();

        assert_eq!(
            text,
            [
                ["SO001", "100", "INV/1", "40", "107"],
                ["SO001", "100", "INV/2", "60", "107"],
                ["SO001", "7", "", "", "107"],
            ]
        );
    }

    #[test]
    fn test_empty_fan_out_yields_one_row() {
        let mapping = ColumnMapping::new()
            .field("Order", "name")
            .field("Qty", "qty")
            .fan_out(["order_line"]);

        for json in [
            r#"{"name": "SO009", "order_line": []}"#,
            r#"{"name": "SO009", "order_line": false}"#,
            r#"{"name": "SO009"}"#,
        ] {
            let rows = flatten(&record(json), &mapping);
            assert_eq!(rows.len(), 1, "input: {}", json);
            assert_eq!(rows[0].get("Order"), Some(&Cell::text("SO009")));
            assert!(rows[0].get("Qty").unwrap().is_empty());
        }
    }

    #[test]
    fn test_malformed_reference_does_not_fail() {
        let input = record(r#"{"partner_id": 12345}"#);
        let mapping = ColumnMapping::new().nested("Customer", "partner_id", "display_name");

        let rows = flatten(&input, &mapping);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Customer").unwrap().to_string(), "12345");
    }

    #[test]
    fn test_failed_column_is_blank() {
        let mapping = ColumnMapping::new()
            .field("Order", "name")
            .computed("Broken", |_| Err(RuleError::Other("boom".to_string())))
            .computed("Panics", |_| panic!("bad rule"));

        let rows = flatten(&record(r#"{"name": "SO001"}"#), &mapping);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Order"), Some(&Cell::text("SO001")));
        assert!(rows[0].get("Broken").unwrap().is_empty());
        assert!(rows[0].get("Panics").unwrap().is_empty());
    }

    #[test]
    fn test_columns_follow_mapping_order() {
        let mapping = ColumnMapping::new()
            .field("Z", "name")
            .field("A", "partner_id")
            .field("M", "missing");

        let rows = flatten(&sale_order(), &mapping);
        let columns: Vec<&str> = rows[0].columns().collect();
        assert_eq!(columns, ["Z", "A", "M"]);
    }

    #[test]
    fn test_flatten_is_idempotent() {
        let mapping = ColumnMapping::new()
            .field("Order", "name")
            .field("Product", "product_id")
            .field("Invoice", "move_name")
            .fan_out(["order_line", "invoice_lines"]);
        let input = sale_order();

        assert_eq!(flatten(&input, &mapping), flatten(&input, &mapping));
    }

    #[test]
    fn test_flatten_all_keeps_record_order() {
        let records = vec![
            record(r#"{"name": "SO002"}"#),
            record(r#"{"name": "SO001"}"#),
        ];
        let mapping = ColumnMapping::new().field("Order", "name");

        let rows = flatten_all(&records, &mapping);
        assert_eq!(rows[0].get("Order"), Some(&Cell::text("SO002")));
        assert_eq!(rows[1].get("Order"), Some(&Cell::text("SO001")));
    }

    #[test]
    fn test_resolve_shapes() {
        let input = record(
            r#"{
                "unset": false,
                "null": null,
                "pair": [4, "Blue"],
                "named": {"id": 1, "display_name": "Red"},
                "blank_name": {"id": 1, "display_name": false}
            }"#,
        );

        assert_eq!(resolve(input.get("unset").unwrap(), None), "");
        assert_eq!(resolve(input.get("null").unwrap(), None), "");
        assert_eq!(resolve(input.get("pair").unwrap(), None), "Blue");
        assert_eq!(resolve(input.get("named").unwrap(), None), "Red");
        assert_eq!(resolve(input.get("blank_name").unwrap(), None), "");
    }
}
