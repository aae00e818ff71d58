//! Drill-through from a cursor-addressed cell down to detail rows.

use std::sync::atomic::Ordering;

use axial::cellset::fixture::{column, GridCellSet};
use axial::{CellSetCursor, CellValue, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn drillable_grid() -> GridCellSet {
    GridCellSet::new()
        .with_axis(["[M].[Sales]"])
        .with_axis(["[P].[Drink]", "[P].[Food]"])
        .with_cell(&[0, 0], Decimal::from_str("24.75").expect("literal"))
        .with_drill_rows(
            &[0, 0],
            vec![
                column("product_name", "VARCHAR"),
                column("store_sales", "DECIMAL"),
            ],
            vec![
                vec![
                    CellValue::from("Juice"),
                    CellValue::Decimal(Decimal::from_str("10.25").expect("literal")),
                ],
                vec![
                    CellValue::from("Soda"),
                    CellValue::Decimal(Decimal::from_str("14.50").expect("literal")),
                ],
            ],
        )
}

#[test]
fn drill_through_returns_typed_rows() -> Result<()> {
    init_tracing();
    let grid = drillable_grid();
    let cursor = CellSetCursor::new(Box::new(grid));
    let mut drill = cursor.drill_through(&[0, 0], None)?;
    let rows = drill.rows()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], CellValue::from("Juice"));
    assert_eq!(
        rows[1][1],
        CellValue::Decimal(Decimal::from_str("14.50").expect("literal"))
    );
    Ok(())
}

#[test]
fn column_metadata_is_cached_and_survives_draining() -> Result<()> {
    let grid = drillable_grid();
    let cursor = CellSetCursor::new(Box::new(grid));
    let mut drill = cursor.drill_through(&[0, 0], None)?;
    drill.rows()?;
    let columns = drill.columns()?;
    assert_eq!(columns.len(), 2);
    assert_eq!(columns[1].name, "store_sales");
    assert_eq!(columns[1].column_type, "DECIMAL");
    Ok(())
}

#[test]
fn max_rows_truncates_the_stream() -> Result<()> {
    let grid = drillable_grid();
    let cursor = CellSetCursor::new(Box::new(grid));
    let mut drill = cursor.drill_through(&[0, 0], Some(1))?;
    assert_eq!(drill.rows()?.len(), 1);
    Ok(())
}

#[test]
fn non_drillable_cell_yields_no_rows() -> Result<()> {
    let grid = drillable_grid();
    let cursor = CellSetCursor::new(Box::new(grid));
    let mut drill = cursor.drill_through(&[0, 1], None)?;
    assert!(drill.is_exhausted());
    assert!(drill.fetch()?.is_none());
    assert!(drill.rows()?.is_empty());
    Ok(())
}

#[test]
fn stream_closes_exactly_once_even_when_abandoned() -> Result<()> {
    let grid = drillable_grid();
    let closes = grid.close_counter();
    let cursor = CellSetCursor::new(Box::new(grid));
    {
        let mut drill = cursor.drill_through(&[0, 0], None)?;
        assert!(drill.fetch()?.is_some());
        // Dropped after a partial read.
    }
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    let mut drained = cursor.drill_through(&[0, 0], None)?;
    drained.rows()?;
    assert!(drained.fetch()?.is_none());
    assert_eq!(closes.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn out_of_range_drill_coordinates_are_addressing_errors() {
    let grid = drillable_grid();
    let cursor = CellSetCursor::new(Box::new(grid));
    let err = cursor.drill_through(&[0, 5], None).unwrap_err();
    assert_eq!(err.code(), "Addressing");
}
