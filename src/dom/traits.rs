use crate::dom::types::{ElementId, Size};
use crate::errors::MapResult;

/// The DOM-like environment an image map is built in.
///
/// Mirrors the small slice of a browser document the map needs: element
/// creation, inline styles, tree edits and two layout reads (intrinsic and
/// rendered size). Implementations own every element; callers hold
/// [`ElementId`] handles.
pub trait Document {
    /// Root element that everything visible hangs off.
    fn body(&self) -> ElementId;

    fn create_element(&mut self, tag: &str) -> ElementId;

    /// Set one inline style property. Property names and values are not
    /// validated; unknown ones are kept and ignored by layout.
    fn set_style(&mut self, el: ElementId, property: &str, value: &str) -> MapResult<()>;

    fn style(&self, el: ElementId, property: &str) -> Option<String>;

    fn set_class_name(&mut self, el: ElementId, class_name: &str) -> MapResult<()>;

    /// Point an image element at `url`. Loading is driven by the host.
    fn set_src(&mut self, el: ElementId, url: &str) -> MapResult<()>;

    /// Append `child` to `parent`, detaching it from any previous parent first.
    fn append_child(&mut self, parent: ElementId, child: ElementId) -> MapResult<()>;

    fn remove_child(&mut self, parent: ElementId, child: ElementId) -> MapResult<()>;

    fn children(&self, el: ElementId) -> Vec<ElementId>;

    fn parent(&self, el: ElementId) -> Option<ElementId>;

    /// Record the intrinsic size of a finished image load. Engines that
    /// learn this on their own may treat it as a no-op.
    fn resolve_image(&mut self, el: ElementId, natural: Size) -> MapResult<()>;

    /// Intrinsic size of a loaded image, `None` until the load completes.
    fn natural_size(&self, el: ElementId) -> Option<Size>;

    /// Current laid-out size. Elements outside the rendered tree are `0x0`.
    fn rendered_size(&self, el: ElementId) -> Size;
}
