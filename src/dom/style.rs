/// Inline style helper and the fixed style tables used by the image map.
use crate::dom::traits::Document;
use crate::dom::types::{ElementId, StyleValue};
use crate::errors::MapResult;

/// Styles for the map image: fills its wrapper, pinned to the top-left.
pub const IMAGE_STYLES: &[(&str, StyleValue)] = &[
    ("width", StyleValue::Text(std::borrow::Cow::Borrowed("100%"))),
    ("height", StyleValue::Text(std::borrow::Cow::Borrowed("100%"))),
    ("left", StyleValue::Number(0.0)),
    ("top", StyleValue::Number(0.0)),
];

/// Styles for every binding element. The translate makes `left`/`top` address
/// the element's centre instead of its top-left corner.
pub const BINDING_ELEMENT_STYLES: &[(&str, StyleValue)] = &[
    ("position", StyleValue::Text(std::borrow::Cow::Borrowed("absolute"))),
    (
        "transform",
        StyleValue::Text(std::borrow::Cow::Borrowed("translate(-50%, -50%)")),
    ),
];

/// Styles for the wrapper that groups the image and its binding elements.
/// Relative positioning makes it the containing block of the absolutely
/// positioned binding elements.
pub fn wrapper_styles(max_width: f64) -> Vec<(&'static str, StyleValue)> {
    vec![
        ("display", "flex".into()),
        ("position", "relative".into()),
        ("max-width", format!("{max_width}px").into()),
        ("width", "fit-content".into()),
        ("height", "fit-content".into()),
    ]
}

/// Apply every `(property, value)` pair as an inline style on `el`.
pub fn apply_styles<D, I, K, V>(doc: &mut D, el: ElementId, styles: I) -> MapResult<()>
where
    D: Document + ?Sized,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<StyleValue>,
{
    for (property, value) in styles {
        let value: StyleValue = value.into();
        doc.set_style(el, property.as_ref(), &value.to_string())?;
    }
    Ok(())
}

/// [`apply_styles`] for the static tables above.
pub fn apply_style_table<D>(doc: &mut D, el: ElementId, table: &[(&str, StyleValue)]) -> MapResult<()>
where
    D: Document + ?Sized,
{
    apply_styles(doc, el, table.iter().map(|(k, v)| (*k, v.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::headless::HeadlessDocument;
    use crate::dom::types::Size;

    #[test]
    fn test_apply_styles_sets_every_entry() {
        let mut doc = HeadlessDocument::new(Size::new(800.0, 600.0));
        let el = doc.create_element("div");

        apply_styles(&mut doc, el, [("left", "10px"), ("top", "20px")]).unwrap();

        assert_eq!(doc.style(el, "left").as_deref(), Some("10px"));
        assert_eq!(doc.style(el, "top").as_deref(), Some("20px"));
    }

    #[test]
    fn test_numbers_are_written_without_unit() {
        let mut doc = HeadlessDocument::new(Size::new(800.0, 600.0));
        let img = doc.create_element("img");

        apply_style_table(&mut doc, img, IMAGE_STYLES).unwrap();

        assert_eq!(doc.style(img, "left").as_deref(), Some("0"));
        assert_eq!(doc.style(img, "width").as_deref(), Some("100%"));
    }

    #[test]
    fn test_unknown_properties_pass_through() {
        let mut doc = HeadlessDocument::new(Size::new(800.0, 600.0));
        let el = doc.create_element("span");

        apply_styles(&mut doc, el, [("not-a-property", StyleValue::from(3.0))]).unwrap();

        assert_eq!(doc.style(el, "not-a-property").as_deref(), Some("3"));
    }

    #[test]
    fn test_wrapper_max_width_follows_option() {
        let styles = wrapper_styles(640.0);
        let max_width = styles.iter().find(|(k, _)| *k == "max-width").map(|(_, v)| v.to_string());
        assert_eq!(max_width.as_deref(), Some("640px"));
    }
}
