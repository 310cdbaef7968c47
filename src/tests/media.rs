use std::sync::Arc;

use super::Document;
use crate::{AssetOptions, LocalAssets, PlannedCopy};

#[test]
fn builtin_handlers() {
    let output = Document::new(
        r#"<mf-document><mf-media src="clip.mp4"></mf-media><mf-media src="song.ogg"></mf-media><mf-media></mf-media></mf-document>"#,
    )
    .render();
    insta::assert_snapshot!(output, @r#"
    ├─ errors
    │ <mf-media>: missing src
    ├─ html
    │ <mf-document role="document"><video controls="controls" src="clip.mp4"></video><audio controls="controls" src="song.ogg"></audio><mf-error><code>&lt;mf-media&gt;</code>: missing <code>src</code></mf-error></mf-document>
    "#);
}

#[test]
fn local_files_are_copied() {
    let assets = Arc::new(
        LocalAssets::new("posts/first.xml", AssetOptions::default(), "blog")
            .unwrap()
            .file("posts/cat.png", "c4t"),
    );
    let output = Document::new(
        r#"<mf-document><mf-media src="cat.png" alt="Cat"></mf-media><mf-media src="https://example.com/dog.png"></mf-media></mf-document>"#,
    )
    .assets(assets.clone())
    .render();
    insta::assert_snapshot!(output, @r#"
    ├─ html
    │ <mf-document role="document"><img src="/blog/c4t/cat.png" alt="Cat" /><img src="https://example.com/dog.png" /></mf-document>
    "#);
    assert_eq!(
        assets.planned_copies(),
        [PlannedCopy {
            source: "posts/cat.png".into(),
            destination: "c4t/cat.png".into(),
        }]
    );
}
