use super::Document;

#[test]
fn equations_keep_their_source_by_default() {
    let output = Document::new(
        "<mf-document><p><mf-eq>a &lt; b</mf-eq></p><mf-eq-display>x^2</mf-eq-display></mf-document>",
    )
    .render();
    insta::assert_snapshot!(output, @r#"
    ├─ html
    │ <mf-document role="document"><p><mf-eq><span class="math-source">a &lt; b</span></mf-eq></p><mf-eq-display><span class="math-source display">x^2</span></mf-eq-display></mf-document>
    "#);
}

#[test]
fn equations_in_excerpts() {
    let output = Document::new(
        "<mf-document><p>Let <mf-eq>x</mf-eq> be a long variable name.</p></mf-document>",
    )
    .render();
    assert_eq!(
        crate::create_excerpt_html(output.html(), 10),
        r#"<p>Let <mf-eq><span class="math-source">x</span></mf-eq> be a …</p>"#
    );
}
