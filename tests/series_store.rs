use chrono::Utc;
use echemplot::data::series::SeriesStore;
use echemplot::{Sample, Technique};

fn sample(technique: &str, sequence: u64, x: f64, y: f64) -> Sample {
    Sample {
        technique: Technique::from(technique),
        x,
        y,
        sequence,
        received_at: Utc::now(),
    }
}

#[test]
fn max_points_three_keeps_last_three() {
    let mut store = SeriesStore::new(3);
    for (i, x) in [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().enumerate() {
        store.append(&sample("CV", i as u64 + 1, x, x * 10.0));
    }
    let cv = store.get("CV").unwrap();
    assert_eq!(cv.x().iter().copied().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
    assert_eq!(cv.y().iter().copied().collect::<Vec<_>>(), vec![30.0, 40.0, 50.0]);
    assert_eq!(cv.sequences().iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
    assert_eq!(cv.appended(), 5);
}

#[test]
fn append_reports_creation_and_eviction() {
    let mut store = SeriesStore::new(2);
    let first = store.append(&sample("OCV", 1, 0.0, 0.0));
    assert!(first.created);
    assert_eq!(first.index, 0);
    store.append(&sample("OCV", 2, 1.0, 0.0));
    let third = store.append(&sample("OCV", 3, 2.0, 0.0));
    assert!(!third.created);
    assert_eq!(third.evicted, 1);

    let other = store.append(&sample("PEIS", 4, 0.0, 0.0));
    assert!(other.created);
    assert_eq!(other.index, 1);
    assert_eq!(store.total_points(), 3);
}

#[test]
fn x_and_y_stay_aligned_per_technique() {
    let mut store = SeriesStore::new(4);
    let techniques = ["CV", "OCV", "CV", "LP", "CV", "OCV", "CV", "CV", "CV"];
    for (i, t) in techniques.iter().enumerate() {
        store.append(&sample(t, i as u64 + 1, i as f64, -(i as f64)));
    }
    for s in store.iter() {
        assert_eq!(s.x().len(), s.y().len());
        assert_eq!(s.x().len(), s.sequences().len());
        assert!(s.len() <= 4);
    }
    let order: Vec<&str> = store.iter().map(|s| &**s.technique()).collect();
    assert_eq!(order, vec!["CV", "OCV", "LP"]);
}

#[test]
fn snapshot_borrows_current_state() {
    let mut store = SeriesStore::new(10);
    store.append(&sample("CP", 1, 0.0, 1.0));
    store.append(&sample("CP", 2, 1.0, 2.0));
    let snap = store.snapshot();
    assert_eq!(snap.revision, 2);
    assert_eq!(snap.max_points, 10);
    assert_eq!(snap.total_points(), 2);
    assert_eq!(snap.series[0].points().collect::<Vec<_>>(), vec![[0.0, 1.0], [1.0, 2.0]]);
}
