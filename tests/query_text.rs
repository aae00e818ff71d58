//! Rendered query text, token for token.

use axial::{OrderDirection, QueryBuilder, Result};

#[test]
fn crossjoin_renders_pairwise_left_to_right() -> Result<()> {
    let mut q = QueryBuilder::new("[Sales]");
    q.axis(0, ["a", "b"])?.crossjoin(["c", "d"])?;
    assert_eq!(
        q.axis_expr(0).expect("axis set").to_mdx(),
        "CROSSJOIN({a, b}, {c, d})"
    );
    q.crossjoin(["e"])?;
    assert_eq!(
        q.axis_expr(0).expect("axis set").to_mdx(),
        "CROSSJOIN(CROSSJOIN({a, b}, {c, d}), e)"
    );
    Ok(())
}

#[test]
fn nonempty_prefixes_the_axis() -> Result<()> {
    let mut q = QueryBuilder::new("[Sales]");
    q.axis(1, ["x"])?.nonempty()?;
    assert_eq!(q.axis_expr(1).expect("axis set").to_mdx(), "NON EMPTY x");
    Ok(())
}

#[test]
fn hierarchize_wraps_only_the_last_crossjoin_operand() -> Result<()> {
    let mut q = QueryBuilder::new("[Sales]");
    q.rows(["[Product].children"])?
        .crossjoin(["[A]", "[B]"])?
        .hierarchize()?;
    assert_eq!(
        q.axis_expr(1).expect("axis set").to_mdx(),
        "CROSSJOIN([Product].children, HIERARCHIZE({[A], [B]}))"
    );
    Ok(())
}

#[test]
fn hierarchize_all_wraps_the_whole_axis() -> Result<()> {
    let mut q = QueryBuilder::new("[Sales]");
    q.rows(["[Product].children"])?
        .crossjoin(["[A]", "[B]"])?
        .hierarchize_all_post()?;
    assert_eq!(
        q.axis_expr(1).expect("axis set").to_mdx(),
        "HIERARCHIZE(CROSSJOIN([Product].children, {[A], [B]}), POST)"
    );
    Ok(())
}

#[test]
fn where_is_always_parenthesized() -> Result<()> {
    let mut q = QueryBuilder::new("[Sales]");
    q.columns(["[Measures].[Unit Sales]"])?;
    q.r#where(["[T].[Q1]"]);
    assert!(q.to_mdx().ends_with("WHERE ([T].[Q1])"));
    q.r#where(["[C].[CA]"]);
    assert!(q.to_mdx().ends_with("WHERE ([T].[Q1], [C].[CA])"));
    Ok(())
}

#[test]
fn with_member_precedes_select() -> Result<()> {
    let mut q = QueryBuilder::new("[Sales]");
    q.with_member("[M].[P]").r#as("1+1").option("SOLVE_ORDER", 1);
    q.columns(["[M].[P]"])?;
    let mdx = q.to_mdx();
    let with_at = mdx.find("MEMBER [M].[P] AS '1+1', SOLVE_ORDER = 1").expect("member def");
    let select_at = mdx.find("SELECT").expect("select");
    assert!(with_at < select_at);
    Ok(())
}

#[test]
fn with_set_body_is_quoted() -> Result<()> {
    let mut q = QueryBuilder::new("[Sales]");
    q.with_set("[Best]")
        .r#as(["[A]", "[B]"])?
        .top_count_by(3, "[Measures].[Sales]")?;
    q.rows(["[Best]"])?;
    assert!(q
        .to_mdx()
        .contains("SET [Best] AS 'TOPCOUNT({[A], [B]}, 3, [Measures].[Sales])'"));
    Ok(())
}

#[test]
fn full_query_lists_axes_in_ascending_order() -> Result<()> {
    let mut q = QueryBuilder::new("[Sales]");
    q.rows(["[Product].children"])?
        .order("[Measures].[Unit Sales]", OrderDirection::Desc)?;
    q.columns(["[Measures].[Unit Sales]", "[Measures].[Store Sales]"])?;
    q.pages(["[Time].[2024]"])?;
    assert_eq!(
        q.to_mdx(),
        "SELECT {[Measures].[Unit Sales], [Measures].[Store Sales]} ON COLUMNS,\n\
         ORDER([Product].children, [Measures].[Unit Sales], DESC) ON ROWS,\n\
         [Time].[2024] ON PAGES\n\
         FROM [Sales]"
    );
    Ok(())
}

#[test]
fn identical_call_sequences_render_identically() -> Result<()> {
    let build = || -> Result<String> {
        let mut q = QueryBuilder::new("[Sales]");
        q.with_member("[M].[Margin]")
            .r#as("[M].[Profit] / [M].[Sales]")
            .option("FORMAT_STRING", "0.0%");
        q.columns(["[M].[Sales]", "[M].[Margin]"])?;
        q.rows(["[Product].children"])?
            .nonempty_crossjoin(["[Time].[2024].children"])?
            .except(["[Time].[2024].[Q4]"])?
            .filter_nonempty()?
            .top_count_by(10, "[M].[Sales]")?;
        q.r#where(["[Customer].[USA]"]);
        Ok(q.to_mdx())
    };
    assert_eq!(build()?, build()?);
    Ok(())
}
