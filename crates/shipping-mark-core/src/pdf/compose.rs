//! Label overlay compositing.
//!
//! Each page is handled in two steps. [`plan_page`] turns the effective
//! parameters into a list of [`DrawCommand`]s; the compositor then renders
//! the commands into a content stream and stacks it on the page.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, StringFormat};
use tracing::{debug, warn};

use super::asset::ImageAsset;
use super::overlay::{media_box, register_resource, stack_content};
use super::text::encode_win_ansi;
use super::tree;
use crate::config::{AppConfig, Color};
use crate::error::{Error, Result};
use crate::params::{EffectiveParams, Rect};
use crate::profile::{
    ADDRESS_RECT_KEYS, ADDRESS_TEXT_KEYS, ExtraField, PAGE_NUM_GAP, PAGE_NUM_X, PAGE_NUM_Y,
};

/// Resource name of the overlay font.
const FONT_NAME: &[u8] = b"SMFont";

/// Resource name of the stamped image.
const IMAGE_NAME: &[u8] = b"SMImage";

// =============================================================================
// Draw Plan
// =============================================================================

/// One drawing step of a page overlay, in PDF user space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Text with its baseline starting at `(x, y)`
    Text { x: f32, y: f32, text: String },
    /// Opaque rectangle in the erase color
    Erase(Rect),
    /// Image asset fitted into the rectangle
    Image(Rect),
}

/// Box number, `gap` spaces, then the total: `"5 10"` for gap 1.
pub fn page_number_text(box_num: u32, total: u32, gap: usize) -> String {
    format!("{box_num}{}{total}", " ".repeat(gap))
}

/// Plan the overlay of one page.
///
/// The page number is always drawn. The address is erased and redrawn only
/// when enabled. Extra fields follow in [`ExtraField::ALL`] order, each only
/// when the profile enables it and its value is non-empty. The image step is
/// planned only when `stamp_image` is set.
pub fn plan_page(
    params: &EffectiveParams<'_>,
    box_num: u32,
    total: u32,
    stamp_image: bool,
) -> Result<Vec<DrawCommand>> {
    let mut commands = Vec::new();

    let (x, y) = params.point([PAGE_NUM_X, PAGE_NUM_Y])?;
    commands.push(DrawCommand::Text {
        x,
        y,
        text: page_number_text(box_num, total, params.count(PAGE_NUM_GAP)?),
    });

    if params.address_enabled() {
        erase_and_draw(
            &mut commands,
            params.rect(ADDRESS_RECT_KEYS)?,
            params.point(ADDRESS_TEXT_KEYS)?,
            params.address().to_string(),
        );
    }

    let profile = params.profile();
    for field in ExtraField::ALL.into_iter().filter(|f| profile.has_field(*f)) {
        match field {
            ExtraField::BatchNumber => {
                let number = params.batch_number();
                if number.is_empty() {
                    continue;
                }
                if let Some(keys) = field.text_keys() {
                    let (x, y) = params.point(keys)?;
                    commands.push(DrawCommand::Text {
                        x,
                        y,
                        text: format!("(  {number}  )"),
                    });
                }
            }
            ExtraField::Barcode => {
                if !stamp_image {
                    continue;
                }
                let Some(keys) = field.rect_keys() else {
                    continue;
                };
                match params.rect(keys) {
                    Ok(bounds) => commands.push(DrawCommand::Image(bounds)),
                    Err(e) => warn!("Skipping image: {}", e),
                }
            }
            _ => {
                let (Some(value_key), Some(rect_keys), Some(text_keys)) =
                    (field.value_key(), field.rect_keys(), field.text_keys())
                else {
                    continue;
                };
                let text = params.text(value_key);
                if text.is_empty() {
                    continue;
                }
                erase_and_draw(
                    &mut commands,
                    params.rect(rect_keys)?,
                    params.point(text_keys)?,
                    text,
                );
            }
        }
    }

    Ok(commands)
}

fn erase_and_draw(commands: &mut Vec<DrawCommand>, area: Rect, (x, y): (f32, f32), text: String) {
    commands.push(DrawCommand::Erase(area));
    commands.push(DrawCommand::Text { x, y, text });
}

// =============================================================================
// Compositor
// =============================================================================

/// Overlay styling.
#[derive(Debug, Clone, Copy)]
pub struct OverlayOptions {
    pub font_size: f32,
    pub text_color: Color,
    pub erase_color: Color,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for OverlayOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            font_size: config.font_size,
            text_color: config.text_color,
            erase_color: config.erase_color,
        }
    }
}

/// Output of [`LabelCompositor::compose`].
#[derive(Debug, Clone)]
pub struct ComposedPages {
    pub pdf_bytes: Vec<u8>,
    pub page_count: usize,
}

/// Draws label overlays onto every page of a document.
#[derive(Debug, Clone, Default)]
pub struct LabelCompositor {
    options: OverlayOptions,
    image: Option<ImageAsset>,
}

impl LabelCompositor {
    pub const fn new(options: OverlayOptions) -> Self {
        Self {
            options,
            image: None,
        }
    }

    /// Stamp `image` on profiles that enable the barcode field.
    #[must_use]
    pub fn with_image(mut self, image: Option<ImageAsset>) -> Self {
        self.image = image;
        self
    }

    /// Overlay every page; page `i` is numbered `first_box + i` of `total_boxes`.
    pub fn compose(
        &self,
        pdf_bytes: &[u8],
        params: &EffectiveParams<'_>,
        first_box: u32,
        total_boxes: u32,
    ) -> Result<ComposedPages> {
        let mut doc = tree::load(pdf_bytes)?;
        let pages = tree::page_ids(&doc);
        let profile = params.profile();

        let font_id = doc.add_object(helvetica());
        let image = self
            .image
            .as_ref()
            .filter(|_| profile.has_field(ExtraField::Barcode))
            .map(|image| (image, image.embed(&mut doc)));

        let (expected_w, expected_h) = profile.page_size.dimensions();

        for (i, &page_id) in pages.iter().enumerate() {
            let offset = u32::try_from(i)
                .map_err(|_| Error::Lopdf(format!("Too many pages: {}", pages.len())))?;
            let box_num = first_box + offset;

            let [x0, y0, x1, y1] = media_box(&doc, page_id);
            if ((x1 - x0) - expected_w).abs() > 1.0 || ((y1 - y0) - expected_h).abs() > 1.0 {
                debug!(
                    "Page {} is {}x{} pt, profile {} expects {}x{}",
                    i + 1,
                    x1 - x0,
                    y1 - y0,
                    profile.name,
                    expected_w,
                    expected_h
                );
            }

            let plan = plan_page(params, box_num, total_boxes, image.is_some())?;
            debug!("Page {}: {} draw commands (box {})", i + 1, plan.len(), box_num);

            let stream = self.render(&plan, image.map(|(asset, _)| asset))?;

            register_resource(&mut doc, page_id, b"Font", FONT_NAME, font_id)?;
            if let Some((_, image_id)) = image
                && plan.iter().any(|c| matches!(c, DrawCommand::Image(_)))
            {
                register_resource(&mut doc, page_id, b"XObject", IMAGE_NAME, image_id)?;
            }
            stack_content(&mut doc, page_id, stream)?;
        }

        doc.compress();
        Ok(ComposedPages {
            pdf_bytes: tree::save(&mut doc)?,
            page_count: pages.len(),
        })
    }

    /// Encode a plan as content stream bytes.
    fn render(&self, plan: &[DrawCommand], image: Option<&ImageAsset>) -> Result<Vec<u8>> {
        let mut ops = Vec::new();

        for command in plan {
            ops.push(Operation::new("q", vec![]));
            match command {
                DrawCommand::Erase(area) => {
                    ops.push(fill_color(self.options.erase_color));
                    ops.push(Operation::new(
                        "re",
                        vec![area.x.into(), area.y.into(), area.w.into(), area.h.into()],
                    ));
                    ops.push(Operation::new("f", vec![]));
                }
                DrawCommand::Text { x, y, text } => {
                    ops.push(fill_color(self.options.text_color));
                    ops.push(Operation::new("BT", vec![]));
                    ops.push(Operation::new(
                        "Tf",
                        vec![
                            Object::Name(FONT_NAME.to_vec()),
                            self.options.font_size.into(),
                        ],
                    ));
                    ops.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                    ops.push(Operation::new(
                        "Tj",
                        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                    ));
                    ops.push(Operation::new("ET", vec![]));
                }
                DrawCommand::Image(bounds) => {
                    if let Some(image) = image {
                        let placed = image.fit(*bounds);
                        ops.push(Operation::new(
                            "cm",
                            vec![
                                placed.w.into(),
                                0.into(),
                                0.into(),
                                placed.h.into(),
                                placed.x.into(),
                                placed.y.into(),
                            ],
                        ));
                        ops.push(Operation::new("Do", vec![Object::Name(IMAGE_NAME.to_vec())]));
                    }
                }
            }
            ops.push(Operation::new("Q", vec![]));
        }

        Content { operations: ops }
            .encode()
            .map_err(|e| Error::Lopdf(format!("Failed to encode overlay: {e}")))
    }
}

fn fill_color(color: Color) -> Operation {
    Operation::new("rg", vec![color.r.into(), color.g.into(), color.b.into()])
}

fn helvetica() -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::params::ParameterOverlay;
    use crate::profile::{ProfileTable, SKIP_ADDRESS};

    fn texts(plan: &[DrawCommand]) -> Vec<&str> {
        plan.iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_page_number_text() {
        assert_eq!(page_number_text(5, 10, 1), "5 10");
        assert_eq!(page_number_text(1, 3, 0), "13");
        assert_eq!(page_number_text(12, 40, 4), "12    40");
    }

    #[test]
    fn test_plan_without_address_only_numbers() {
        let table = ProfileTable::builtin().unwrap();
        let profile = table.get("afghanistan").unwrap();
        let shared = ParameterOverlay::default();
        let params = EffectiveParams::resolve(profile, &shared, Some(SKIP_ADDRESS), None);

        let plan = plan_page(&params, 3, 7, false).unwrap();
        assert_eq!(
            plan,
            vec![DrawCommand::Text {
                x: 238.0,
                y: 45.0,
                text: "3 7".to_string()
            }]
        );
    }

    #[test]
    fn test_plan_address_erases_before_drawing() {
        let table = ProfileTable::builtin().unwrap();
        let profile = table.get("mexico").unwrap();
        let shared = ParameterOverlay::default();
        let params = EffectiveParams::resolve(profile, &shared, Some("Lima"), None);

        let plan = plan_page(&params, 1, 1, false).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(
            plan[1],
            DrawCommand::Erase(Rect {
                x: 202.0,
                y: 455.0,
                w: 500.0,
                h: 20.0
            })
        );
        assert_eq!(texts(&plan)[1], "Lima");
    }

    #[test]
    fn test_plan_fixed_profile_honours_skip_sentinel() {
        let table = ProfileTable::builtin().unwrap();
        let consignee_only = |plan: &[DrawCommand]| {
            assert_eq!(
                texts(plan),
                vec![
                    format!("1{}4", " ".repeat(25)).as_str(),
                    "HUZAIFA GENERAL TRADING LLC"
                ]
            );
            let erased: Vec<&Rect> = plan
                .iter()
                .filter_map(|c| match c {
                    DrawCommand::Erase(area) => Some(area),
                    _ => None,
                })
                .collect();
            assert_eq!(erased.len(), 1);
            assert!((erased[0].y - 493.0).abs() < f32::EPSILON);
        };

        // Sentinel as the shared address override
        let profile = table.get("oman").unwrap();
        let shared = ParameterOverlay::default().with_address(SKIP_ADDRESS);
        let params = EffectiveParams::resolve(profile, &shared, Some("Lima"), None);
        assert!(!params.address_enabled());
        consignee_only(&plan_page(&params, 1, 4, false).unwrap());

        // Sentinel as the profile's fixed address
        let mut profile = profile.clone();
        profile.fixed_address = Some(SKIP_ADDRESS.to_string());
        let shared = ParameterOverlay::default();
        let params = EffectiveParams::resolve(&profile, &shared, None, None);
        assert!(!params.address_enabled());
        consignee_only(&plan_page(&params, 1, 4, false).unwrap());
    }

    #[test]
    fn test_plan_brazil_extra_fields_in_order() {
        let table = ProfileTable::builtin().unwrap();
        let profile = table.get("brazil").unwrap();
        let shared = ParameterOverlay::default();
        let params = EffectiveParams::resolve(profile, &shared, None, Some("L2401"));

        let plan = plan_page(&params, 2, 9, true).unwrap();
        let drawn = texts(&plan);
        assert_eq!(drawn[0], format!("2{}9", " ".repeat(24)));
        assert_eq!(
            &drawn[1..],
            &[
                "RODOVIA ANHANGUERA SSP330 KM298, ZIP CODE: 14140-000, CRAVINHOS - SÃO PAULO - Brazil",
                "OUROFINO AGRONEGOCIO LTDA",
                "INJECTOR",
                "900 Syringe / Carton",
                "(  L2401  )",
            ]
        );
        assert!(matches!(plan.last(), Some(DrawCommand::Image(_))));
    }

    #[test]
    fn test_plan_skips_empty_values() {
        let table = ProfileTable::builtin().unwrap();
        let profile = table.get("chile").unwrap();
        let shared = ParameterOverlay::default().with_override("reg_text", "");
        let params = EffectiveParams::resolve(profile, &shared, None, None);

        let plan = plan_page(&params, 1, 1, false).unwrap();
        let drawn = texts(&plan);
        assert!(!drawn.contains(&"Registered : N° 2477-B"));
        assert!(drawn.contains(&"BOOSTIN ADVANCE"));
    }

    #[test]
    fn test_plan_batch_number_is_not_erased() {
        let table = ProfileTable::builtin().unwrap();
        let profile = table.get("brazil").unwrap();
        let shared = ParameterOverlay {
            skip_address: true,
            ..Default::default()
        }
        .with_override("consignee_name", "")
        .with_override("product_name", "")
        .with_override("box_text", "");
        let params = EffectiveParams::resolve(profile, &shared, None, Some("7"));

        let plan = plan_page(&params, 1, 1, false).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan[1],
            DrawCommand::Text {
                x: 286.0,
                y: 290.0,
                text: "(  7  )".to_string()
            }
        );
    }

    #[test]
    fn test_render_uses_configured_colors() {
        let compositor = LabelCompositor::new(OverlayOptions {
            font_size: 9.0,
            text_color: Color::blue(),
            erase_color: Color::white(),
        });
        let plan = vec![
            DrawCommand::Erase(Rect {
                x: 1.0,
                y: 2.0,
                w: 3.0,
                h: 4.0,
            }),
            DrawCommand::Text {
                x: 10.0,
                y: 20.0,
                text: "N°".to_string(),
            },
        ];

        let bytes = compositor.render(&plan, None).unwrap();
        let content = Content::decode(&bytes).unwrap();
        let names: Vec<&str> = content.operations.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(
            names,
            vec!["q", "rg", "re", "f", "Q", "q", "rg", "BT", "Tf", "Td", "Tj", "ET", "Q"]
        );

        let tj = &content.operations[10];
        assert_eq!(tj.operands[0].as_str().unwrap(), &[b'N', 0xB0][..]);
    }
}
