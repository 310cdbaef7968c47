use indoc::indoc;

use super::Document;

#[test]
fn numbered_headings() {
    let output = Document::new(indoc! {r#"
        <mf-document>
        <h1>Intro</h1>
        <h2>Usage</h2>
        </mf-document>
    "#})
    .heading_numbers()
    .render();
    insta::assert_snapshot!(output, @r#"
    ├─ html
    │ <mf-document role="document">
    │ <a id="intro" class="anchor"></a><h1 data-anchor="intro" aria-level="2"><span class="section-number">1</span> Intro</h1>
    │ <a id="intro/usage" class="anchor"></a><h2 data-anchor="intro/usage" aria-level="3"><span class="section-number">1.1</span> Usage</h2>
    │ </mf-document>
    "#);
}

#[test]
fn explicit_ids_and_empty_headings() {
    let output =
        Document::new(r#"<mf-document><h1 id="custom">Setup</h1><h2>  </h2></mf-document>"#)
            .render();
    insta::assert_snapshot!(output, @r#"
    ├─ html
    │ <mf-document role="document"><a id="custom" class="anchor"></a><h1 data-anchor="custom" aria-level="2">Setup</h1><a id="setup/0.0" class="anchor"></a><h2 data-anchor="setup/0.0" aria-level="3">  </h2></mf-document>
    "#);
}
