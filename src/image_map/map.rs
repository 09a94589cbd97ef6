/// The image map component: a background image with binding elements kept
/// centred on their gates at whatever scale the image is rendered.
use uuid::Uuid;

use crate::dom::style::{apply_style_table, apply_styles, wrapper_styles, BINDING_ELEMENT_STYLES, IMAGE_STYLES};
use crate::dom::traits::Document;
use crate::dom::types::ElementId;
use crate::errors::{MapError, MapResult};
use crate::image_map::scale::{css_px, ScaleRatio};
use crate::image_map::types::{ImageMapConfig, LayoutOptions, MapState, Placement, Reposition};

pub struct ImageMap {
    id: Uuid,
    config: ImageMapConfig,
    layout: LayoutOptions,
    binding_elements: Vec<ElementId>,
    container: ElementId,
    image: ElementId,
    wrapper: Option<ElementId>,
    state: MapState,
}

impl ImageMap {
    /// Create the map image and start pointing it at `config.map_image`.
    ///
    /// `binding_elements[i]` is bound to `config.gates[i]`; the two lists must
    /// have the same length. Nothing is attached to `container` until
    /// [`ImageMap::attach`] runs after the image has loaded.
    pub fn new<D: Document + ?Sized>(
        doc: &mut D,
        config: ImageMapConfig,
        binding_elements: Vec<ElementId>,
        container: ElementId,
    ) -> MapResult<Self> {
        Self::with_layout(doc, config, binding_elements, container, LayoutOptions::default())
    }

    pub fn with_layout<D: Document + ?Sized>(
        doc: &mut D,
        config: ImageMapConfig,
        binding_elements: Vec<ElementId>,
        container: ElementId,
        layout: LayoutOptions,
    ) -> MapResult<Self> {
        if config.gates.len() != binding_elements.len() {
            return Err(MapError::GateCountMismatch {
                gates: config.gates.len(),
                elements: binding_elements.len(),
            });
        }

        let image = doc.create_element("img");
        apply_style_table(doc, image, IMAGE_STYLES)?;
        doc.set_src(image, &config.map_image)?;

        let id = Uuid::new_v4();
        tracing::info!(
            map_id = %id,
            url = %config.map_image,
            gates = config.gates.len(),
            "image map created, waiting for image load"
        );

        Ok(Self {
            id,
            config,
            layout,
            binding_elements,
            container,
            image,
            wrapper: None,
            state: MapState::Loading,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ImageMapConfig {
        &self.config
    }

    pub fn layout(&self) -> &LayoutOptions {
        &self.layout
    }

    pub fn binding_elements(&self) -> &[ElementId] {
        &self.binding_elements
    }

    pub fn container(&self) -> ElementId {
        self.container
    }

    pub fn state(&self) -> MapState {
        self.state
    }

    pub(crate) fn image_element(&self) -> ElementId {
        self.image
    }

    /// Build the wrapper, move the image and binding elements into it, hang
    /// it off the container and position everything once.
    ///
    /// Must run after the image load completed (its natural size is known).
    pub fn attach<D: Document + ?Sized>(&mut self, doc: &mut D) -> MapResult<Reposition> {
        if self.state != MapState::Loading {
            return Err(MapError::InvalidState(format!(
                "attach called in state {:?}",
                self.state
            )));
        }
        let natural = doc
            .natural_size(self.image)
            .ok_or_else(|| MapError::InvalidState("map image has not loaded yet".into()))?;
        // An image that cannot be scaled never touches the tree.
        ScaleRatio::between(natural, natural, self.layout.scale_mode)?;

        let wrapper = doc.create_element("div");
        doc.set_class_name(wrapper, &self.layout.class_name)?;
        apply_styles(doc, wrapper, wrapper_styles(self.layout.max_width))?;
        doc.append_child(wrapper, self.image)?;
        for el in &self.binding_elements {
            doc.append_child(wrapper, *el)?;
            apply_style_table(doc, *el, BINDING_ELEMENT_STYLES)?;
        }
        doc.append_child(self.container, wrapper)?;

        self.wrapper = Some(wrapper);
        self.state = MapState::Attached;
        tracing::info!(map_id = %self.id, wrapper = %wrapper, "image map attached");

        self.update_positions(doc)
    }

    /// Move every binding element to its gate at the image's current scale.
    pub fn update_positions<D: Document + ?Sized>(&self, doc: &mut D) -> MapResult<Reposition> {
        if self.state != MapState::Attached {
            return Err(MapError::InvalidState(format!(
                "cannot position elements in state {:?}",
                self.state
            )));
        }
        let natural = doc
            .natural_size(self.image)
            .ok_or_else(|| MapError::InvalidState("map image has not loaded yet".into()))?;
        let rendered = doc.rendered_size(self.image);
        let ratio = ScaleRatio::between(rendered, natural, self.layout.scale_mode)?;

        let mut placements = Vec::with_capacity(self.binding_elements.len());
        for (index, (el, gate)) in self.binding_elements.iter().zip(&self.config.gates).enumerate() {
            let (left, top) = ratio.apply(gate);
            apply_styles(doc, *el, [("left", css_px(left)), ("top", css_px(top))])?;
            placements.push(Placement {
                index,
                element: *el,
                left,
                top,
            });
        }

        tracing::debug!(
            map_id = %self.id,
            ratio_x = ratio.x,
            ratio_y = ratio.y,
            rendered_width = rendered.width,
            count = placements.len(),
            "binding elements repositioned"
        );
        Ok(Reposition { ratio, placements })
    }

    /// The image failed to load: the map stays detached for good.
    pub fn mark_failed(&mut self) {
        if self.state == MapState::Loading {
            self.state = MapState::Failed;
        }
    }

    /// Take the wrapper out of the container. Binding elements stay inside
    /// the detached wrapper; the caller still owns them.
    pub fn detach<D: Document + ?Sized>(&mut self, doc: &mut D) -> MapResult<()> {
        if let Some(wrapper) = self.wrapper.take() {
            if doc.parent(wrapper) == Some(self.container) {
                doc.remove_child(self.container, wrapper)?;
            }
        }
        self.state = MapState::Disposed;
        tracing::info!(map_id = %self.id, "image map detached");
        Ok(())
    }
}
