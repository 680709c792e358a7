// ABOUTME: Tests for calendar generation from stage presets and per-date editing
// ABOUTME: Exercises idempotence, delete-on-blank, validation and persisted layout

#[cfg(test)]
mod tests {
    use crate::calendar::*;
    use crate::error::AppError;
    use crate::plants::Stage;
    use crate::presets;
    use crate::storage::JsonStore;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn create_test_book() -> (CalendarBook, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonStore::new(temp_dir.path().join("calendar_data.json"));
        (CalendarBook::new(store), temp_dir)
    }

    async fn raw_document(temp_dir: &TempDir) -> Option<String> {
        tokio::fs::read_to_string(temp_dir.path().join("calendar_data.json"))
            .await
            .ok()
    }

    fn map(entries: &[(&str, &str)]) -> PlantCalendar {
        entries
            .iter()
            .map(|(d, t)| (d.to_string(), t.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_generate_seed_calendar() {
        let (book, _temp_dir) = create_test_book();

        book.generate("p1", "seed", "2024-01-01").await.unwrap();

        assert_eq!(
            book.get("p1").await,
            map(&[
                ("2024-01-01", "Soak seeds"),
                ("2024-01-02", "Plant in starter"),
                ("2024-01-04", "Check moisture"),
                ("2024-01-08", "Transplant to veg pot"),
            ])
        );
    }

    #[tokio::test]
    async fn test_generate_matches_preset_for_every_stage() {
        let (book, _temp_dir) = create_test_book();
        let start = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();

        for stage in Stage::ALL {
            let plant_id = format!("plant-{}", stage);
            book.generate(&plant_id, stage.as_str(), "2024-02-27")
                .await
                .unwrap();

            let calendar = book.get(&plant_id).await;
            let tasks = presets::preset(stage);
            assert_eq!(calendar.len(), tasks.len());
            for task in tasks {
                let date = start + chrono::Days::new(u64::from(task.offset));
                let key = date.format(DATE_FORMAT).to_string();
                assert_eq!(calendar.get(&key).map(String::as_str), Some(task.task));
            }
        }
    }

    #[tokio::test]
    async fn test_generate_crosses_leap_day() {
        let (book, _temp_dir) = create_test_book();
        book.generate("p1", "veg", "2024-02-27").await.unwrap();

        let calendar = book.get("p1").await;
        assert_eq!(calendar["2024-02-29"], "Feed nutrients");
        assert_eq!(calendar["2024-03-05"], "Check height");
        assert_eq!(calendar["2024-03-12"], "Top plant");
    }

    #[tokio::test]
    async fn test_generate_is_idempotent() {
        let (book, temp_dir) = create_test_book();

        book.generate("p1", "flower", "2024-05-10").await.unwrap();
        let first = raw_document(&temp_dir).await;
        book.generate("p1", "flower", "2024-05-10").await.unwrap();

        assert_eq!(raw_document(&temp_dir).await, first);
    }

    #[tokio::test]
    async fn test_generate_overwrites_same_dates_and_keeps_others() {
        let (book, _temp_dir) = create_test_book();

        book.upsert("p1", Some("2024-01-01"), Some("Custom"))
            .await
            .unwrap();
        book.upsert("p1", Some("2023-12-25"), Some("Holiday check"))
            .await
            .unwrap();
        book.generate("p1", "seed", "2024-01-01").await.unwrap();

        let calendar = book.get("p1").await;
        assert_eq!(calendar["2024-01-01"], "Soak seeds");
        assert_eq!(calendar["2023-12-25"], "Holiday check");
        assert_eq!(calendar.len(), 5);
    }

    #[tokio::test]
    async fn test_generate_rejects_bad_input() {
        let (book, temp_dir) = create_test_book();

        for (stage, start) in [
            ("harvest", "2024-01-01"),
            ("", "2024-01-01"),
            ("seed", ""),
            ("seed", "01/02/2024"),
            ("seed", "2024-02-30"),
        ] {
            assert!(
                matches!(
                    book.generate("p1", stage, start).await,
                    Err(AppError::InvalidRequest(_))
                ),
                "stage={:?} start={:?}",
                stage,
                start
            );
        }
        assert!(raw_document(&temp_dir).await.is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_plant_is_empty() {
        let (book, _temp_dir) = create_test_book();
        book.generate("p1", "seed", "2024-01-01").await.unwrap();

        assert!(book.get("other").await.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_requires_date_and_task() {
        let (book, temp_dir) = create_test_book();
        book.upsert("p1", Some("2024-03-01"), Some("Water"))
            .await
            .unwrap();
        let before = raw_document(&temp_dir).await;

        for (date, task) in [
            (None, Some("Water")),
            (Some("2024-03-02"), None),
            (Some(""), Some("Water")),
            (Some("2024-03-02"), Some("")),
            (Some("2024-03-02"), Some("   ")),
        ] {
            assert!(matches!(
                book.upsert("p1", date, task).await,
                Err(AppError::InvalidRequest(_))
            ));
        }

        assert_eq!(raw_document(&temp_dir).await, before);
        assert_eq!(book.get("p1").await, map(&[("2024-03-01", "Water")]));
    }

    #[tokio::test]
    async fn test_upsert_normalizes_date_key() {
        let (book, _temp_dir) = create_test_book();
        book.upsert("p1", Some("2024-3-7"), Some("Flush"))
            .await
            .unwrap();

        assert_eq!(book.get("p1").await, map(&[("2024-03-07", "Flush")]));
    }

    #[tokio::test]
    async fn test_update_sets_and_blank_removes() {
        let (book, _temp_dir) = create_test_book();

        book.update("p1", Some("2024-04-01"), Some("Defoliate"))
            .await
            .unwrap();
        assert_eq!(book.get("p1").await["2024-04-01"], "Defoliate");

        book.update("p1", Some("2024-04-01"), Some("   "))
            .await
            .unwrap();
        assert!(!book.get("p1").await.contains_key("2024-04-01"));

        // Removing again is fine
        book.update("p1", Some("2024-04-01"), Some(""))
            .await
            .unwrap();
        assert!(!book.get("p1").await.contains_key("2024-04-01"));
    }

    #[tokio::test]
    async fn test_update_blank_on_unknown_plant_does_not_write() {
        let (book, temp_dir) = create_test_book();
        book.update("ghost", Some("2024-04-01"), Some(""))
            .await
            .unwrap();

        assert!(raw_document(&temp_dir).await.is_none());
    }

    #[tokio::test]
    async fn test_update_blank_removes_legacy_key() {
        let (book, temp_dir) = create_test_book();
        tokio::fs::write(
            temp_dir.path().join("calendar_data.json"),
            r#"{"p1": {"someday": "Old note", "2024-01-01": "Keep"}}"#,
        )
        .await
        .unwrap();

        book.update("p1", Some("someday"), Some("")).await.unwrap();
        assert_eq!(book.get("p1").await, map(&[("2024-01-01", "Keep")]));
    }

    #[tokio::test]
    async fn test_update_rejects_missing_fields_and_bad_dates() {
        let (book, _temp_dir) = create_test_book();

        assert!(matches!(
            book.update("p1", None, Some("Water")).await,
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            book.update("p1", Some("2024-01-01"), None).await,
            Err(AppError::InvalidRequest(_))
        ));
        assert!(matches!(
            book.update("p1", Some("tomorrow"), Some("Water")).await,
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_all() {
        let (book, temp_dir) = create_test_book();
        book.generate("p1", "seed", "2024-01-01").await.unwrap();
        book.generate("p2", "veg", "2024-01-01").await.unwrap();

        book.remove_all("p1").await.unwrap();
        assert!(book.get("p1").await.is_empty());
        assert_eq!(book.get("p2").await.len(), 4);

        // Unknown plant: success and no rewrite
        let before = raw_document(&temp_dir).await;
        book.remove_all("p1").await.unwrap();
        book.remove_all("never").await.unwrap();
        assert_eq!(raw_document(&temp_dir).await, before);
    }

    #[tokio::test]
    async fn test_mutation_refuses_to_overwrite_corrupt_document() {
        let (book, temp_dir) = create_test_book();
        let path = temp_dir.path().join("calendar_data.json");
        tokio::fs::write(&path, "{\"p1\": ").await.unwrap();

        assert!(matches!(
            book.generate("p2", "seed", "2024-01-01").await,
            Err(AppError::StorageFailure(_))
        ));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "{\"p1\": ");
        // Reads still degrade to empty
        assert!(book.get("p1").await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_upserts_all_land() {
        let (book, _temp_dir) = create_test_book();
        let book = std::sync::Arc::new(book);

        let mut handles = Vec::new();
        for day in 1..=20u32 {
            let book = book.clone();
            handles.push(tokio::spawn(async move {
                let date = format!("2024-06-{:02}", day);
                book.upsert("p1", Some(&date), Some("Water")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(book.get("p1").await.len(), 20);
    }

    #[test]
    fn test_project_offsets() {
        let start = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
        let projected: BTreeMap<String, &str> =
            project(Stage::Seed, start).unwrap().into_iter().collect();

        assert_eq!(projected["2024-12-30"], "Soak seeds");
        assert_eq!(projected["2024-12-31"], "Plant in starter");
        assert_eq!(projected["2025-01-02"], "Check moisture");
        assert_eq!(projected["2025-01-06"], "Transplant to veg pot");
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2024-01-01").is_ok());
        assert!(parse_date(" 2024-01-01 ").is_ok());
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("20240101").is_err());
    }
}
