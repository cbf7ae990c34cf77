/// SVG rectangle extractor.
///
/// Pads come out of PCB tools as `<path>` outlines or `<rect>` elements.
/// Each one becomes a [`Rect`] in document order. Path data is accepted
/// only when it traces an axis-aligned rectangle; curves, diagonals and
/// interior vertices are rejected rather than silently boxed.
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{CutoutError, Result};
use crate::geometry::{BoundingBox2, Rect, Vec2};

/// Tolerance for "on the bounding box" and "axis-aligned" checks.
const SHAPE_TOLERANCE: f64 = 1e-6;

/// Rectangles and units pulled from one SVG document.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgRects {
    /// Letters of the root `width`/`height` attribute, `"px"` when absent.
    pub units: String,
    pub rects: Vec<Rect>,
}

/// Parse an SVG string and return every rectangle it outlines.
///
/// Elements are matched by local name, so `<svg:path>` counts as a path.
/// Comments, CDATA and processing instructions are skipped.
pub fn parse_svg(svg: &str) -> Result<SvgRects> {
    let mut reader = Reader::from_str(svg);
    let mut rects = Vec::new();
    let mut units = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| CutoutError::Svg(format!("malformed markup: {e}")))?;
        let tag = match event {
            Event::Start(e) | Event::Empty(e) => e,
            Event::Eof => break,
            _ => continue,
        };
        let index = rects.len();
        match tag.local_name().as_ref() {
            b"svg" if units.is_none() => units = Some(document_units(&tag)?),
            b"path" => {
                if let Some(d) = get_attr(&tag, "d")? {
                    rects.push(rect_from_path(&d, index)?);
                }
            }
            b"rect" => {
                let num = |name: &str| -> Result<f64> {
                    match get_attr(&tag, name)? {
                        Some(v) => parse_length(&v),
                        None => Ok(0.0),
                    }
                };
                let rect = Rect::new(num("x")?, num("y")?, num("width")?, num("height")?);
                if !rect.is_valid() {
                    return Err(CutoutError::InvalidRectangle {
                        index,
                        width: rect.width,
                        height: rect.height,
                    });
                }
                rects.push(rect);
            }
            _ => {}
        }
    }

    Ok(SvgRects {
        units: units.unwrap_or_else(|| "px".into()),
        rects,
    })
}

// ── Attributes ───────────────────────────────────────────────────────

/// Value of the unprefixed attribute `name`, if present.
fn get_attr(tag: &BytesStart, name: &str) -> Result<Option<String>> {
    for attr in tag.attributes() {
        let attr = attr.map_err(|e| CutoutError::Svg(format!("bad attribute: {e}")))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| CutoutError::Svg(format!("bad attribute value: {e}")))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Unit letters from the root element's `width`, else `height`.
fn document_units(root: &BytesStart) -> Result<String> {
    for name in ["width", "height"] {
        if let Some(v) = get_attr(root, name)? {
            let letters: String = v.chars().filter(|c| c.is_ascii_alphabetic()).collect();
            if !letters.is_empty() {
                return Ok(letters);
            }
        }
    }
    Ok("px".into())
}

/// A number with an optional unit suffix, e.g. `0.25in`.
fn parse_length(s: &str) -> Result<f64> {
    let trimmed = s.trim().trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
    trimmed
        .parse::<f64>()
        .map_err(|_| CutoutError::Svg(format!("expected a length, got '{s}'")))
}

// ── Path data ────────────────────────────────────────────────────────

fn rect_from_path(d: &str, index: usize) -> Result<Rect> {
    let points = outline_points(d, index)?;
    let non_rect = |reason: &str| CutoutError::NonRectangular {
        index,
        reason: reason.into(),
    };

    if points.len() < 2 {
        return Err(non_rect("fewer than two vertices"));
    }
    for w in points.windows(2) {
        let dx = (w[1].x - w[0].x).abs();
        let dy = (w[1].y - w[0].y).abs();
        if dx > SHAPE_TOLERANCE && dy > SHAPE_TOLERANCE {
            return Err(non_rect("diagonal segment"));
        }
    }

    let bounds = BoundingBox2::from_points(&points).ok_or_else(|| non_rect("no vertices"))?;
    if points
        .iter()
        .any(|p| !bounds.on_perimeter(*p, SHAPE_TOLERANCE))
    {
        return Err(non_rect("vertex inside the outline"));
    }

    let rect = Rect::from_corners(bounds.min, bounds.max);
    if !rect.is_valid() {
        return Err(CutoutError::InvalidRectangle {
            index,
            width: rect.width,
            height: rect.height,
        });
    }
    Ok(rect)
}

/// Vertices visited by a path made of move, line and close commands.
fn outline_points(d: &str, index: usize) -> Result<Vec<Vec2>> {
    let mut points = Vec::new();
    let mut cursor = Vec2::new(0.0, 0.0);
    let mut start = cursor;

    let tokens = tokenize_d(d);
    let mut i = 0;

    while i < tokens.len() {
        let cmd = tokens[i].as_str();
        i += 1;
        match cmd {
            "M" | "m" | "L" | "l" => {
                let relative = cmd == "m" || cmd == "l";
                let mut first = true;
                while i < tokens.len() && is_number(&tokens[i]) {
                    let (x, y) = read_pair(&tokens, &mut i)?;
                    cursor = if relative {
                        Vec2::new(cursor.x + x, cursor.y + y)
                    } else {
                        Vec2::new(x, y)
                    };
                    if first && (cmd == "M" || cmd == "m") {
                        start = cursor;
                    }
                    first = false;
                    points.push(cursor);
                }
            }
            "H" | "h" => {
                while i < tokens.len() && is_number(&tokens[i]) {
                    let x = read_one(&tokens, &mut i)?;
                    cursor.x = if cmd == "h" { cursor.x + x } else { x };
                    points.push(cursor);
                }
            }
            "V" | "v" => {
                while i < tokens.len() && is_number(&tokens[i]) {
                    let y = read_one(&tokens, &mut i)?;
                    cursor.y = if cmd == "v" { cursor.y + y } else { y };
                    points.push(cursor);
                }
            }
            "Z" | "z" => {
                cursor = start;
                points.push(cursor);
            }
            "C" | "c" | "S" | "s" | "Q" | "q" | "T" | "t" | "A" | "a" => {
                return Err(CutoutError::NonRectangular {
                    index,
                    reason: format!("curve command '{cmd}'"),
                });
            }
            other => {
                return Err(CutoutError::Svg(format!(
                    "unexpected token '{other}' in path {index}"
                )));
            }
        }
    }
    Ok(points)
}

fn tokenize_d(d: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut buf = String::new();

    for ch in d.chars() {
        if ch.is_ascii_alphabetic() && ch != 'e' && ch != 'E' {
            if !buf.is_empty() {
                tokens.push(std::mem::take(&mut buf));
            }
            tokens.push(ch.to_string());
        } else if ch == ',' || ch.is_whitespace() {
            if !buf.is_empty() {
                tokens.push(std::mem::take(&mut buf));
            }
        } else if (ch == '-' || ch == '+')
            && !buf.is_empty()
            && !buf.ends_with('e')
            && !buf.ends_with('E')
        {
            tokens.push(std::mem::take(&mut buf));
            buf.push(ch);
        } else if ch == '.' && buf.contains(['.', 'e', 'E']) {
            // `.5.5` is two numbers
            tokens.push(std::mem::take(&mut buf));
            buf.push(ch);
        } else {
            buf.push(ch);
        }
    }
    if !buf.is_empty() {
        tokens.push(buf);
    }
    tokens
}

fn is_number(s: &str) -> bool {
    s.parse::<f64>().is_ok()
}

fn read_one(tokens: &[String], i: &mut usize) -> Result<f64> {
    let tok = tokens
        .get(*i)
        .ok_or_else(|| CutoutError::Svg("unexpected end of path data".into()))?;
    let val = tok
        .parse::<f64>()
        .map_err(|_| CutoutError::Svg(format!("expected number, got '{tok}'")))?;
    *i += 1;
    Ok(val)
}

fn read_pair(tokens: &[String], i: &mut usize) -> Result<(f64, f64)> {
    let a = read_one(tokens, i)?;
    let b = read_one(tokens, i)?;
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path() {
        let svg = r#"<svg width="2in" height="1in"><path d="M 0.1,0.2 L 0.5,0.2 L 0.5,0.4 L 0.1,0.4 Z"/></svg>"#;
        let doc = parse_svg(svg).unwrap();
        assert_eq!(doc.units, "in");
        assert_eq!(doc.rects.len(), 1);
        let r = doc.rects[0];
        assert!((r.x - 0.1).abs() < 1e-12);
        assert!((r.y - 0.2).abs() < 1e-12);
        assert!((r.width - 0.4).abs() < 1e-12);
        assert!((r.height - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_relative_and_hv_path() {
        let svg = r#"<svg><path d="m 10 10 h 5 v 2 h -5 z"/></svg>"#;
        let doc = parse_svg(svg).unwrap();
        assert_eq!(doc.rects, vec![Rect::new(10.0, 10.0, 5.0, 2.0)]);
        assert_eq!(doc.units, "px");
    }

    #[test]
    fn test_rect_elements_and_order() {
        let svg = r#"<svg width="100mm"><path d="M0 0 L1 0 L1 1 L0 1 Z"/>
            <rect x="5" y="6" width="2" height="3" rx="0.5"/></svg>"#;
        let doc = parse_svg(svg).unwrap();
        assert_eq!(doc.units, "mm");
        assert_eq!(
            doc.rects,
            vec![Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(5.0, 6.0, 2.0, 3.0)]
        );
    }

    #[test]
    fn test_mixed_elements_keep_document_order() {
        let svg = r#"<svg><rect x="9" y="9" width="1" height="1"/>
            <g><path d="M0 0 H1 V1 H0 Z"/></g><rect x="4" y="4" width="1" height="1"/></svg>"#;
        let doc = parse_svg(svg).unwrap();
        let xs: Vec<f64> = doc.rects.iter().map(|r| r.x).collect();
        assert_eq!(xs, vec![9.0, 0.0, 4.0]);
    }

    #[test]
    fn test_collinear_vertices_accepted() {
        let svg = r#"<svg><path d="M0 0 L1 0 L2 0 L2 1 L0 1 Z"/></svg>"#;
        let doc = parse_svg(svg).unwrap();
        assert_eq!(doc.rects, vec![Rect::new(0.0, 0.0, 2.0, 1.0)]);
    }

    #[test]
    fn test_curve_rejected() {
        let svg = r#"<svg><path d="M0 0 C 1 1 2 2 3 3"/></svg>"#;
        assert!(matches!(
            parse_svg(svg),
            Err(CutoutError::NonRectangular { index: 0, .. })
        ));
    }

    #[test]
    fn test_diagonal_rejected() {
        let svg = r#"<svg><path d="M0 0 L1 0 L1 1 L0 1 Z"/><path d="M0 0 L1 1 L0 1 Z"/></svg>"#;
        assert!(matches!(
            parse_svg(svg),
            Err(CutoutError::NonRectangular { index: 1, .. })
        ));
    }

    #[test]
    fn test_interior_vertex_rejected() {
        // an L-shaped outline has a reflex corner off the bounding box
        let svg = r#"<svg><path d="M0 0 H2 V1 H1 V2 H0 Z"/></svg>"#;
        assert!(matches!(
            parse_svg(svg),
            Err(CutoutError::NonRectangular { .. })
        ));
    }

    #[test]
    fn test_zero_height_rejected() {
        let svg = r#"<svg><path d="M0 0 L1 0 Z"/></svg>"#;
        assert!(matches!(
            parse_svg(svg),
            Err(CutoutError::InvalidRectangle { index: 0, .. })
        ));
        let svg = r#"<svg><rect x="0" y="0" width="0" height="1"/></svg>"#;
        assert!(matches!(
            parse_svg(svg),
            Err(CutoutError::InvalidRectangle { .. })
        ));
    }

    #[test]
    fn test_no_shapes_is_empty() {
        let doc = parse_svg(r#"<svg width="10in"></svg>"#).unwrap();
        assert!(doc.rects.is_empty());
        assert_eq!(doc.units, "in");
    }

    #[test]
    fn test_bad_number() {
        let svg = r#"<svg><path d="M 0 0 L x 1"/></svg>"#;
        assert!(matches!(parse_svg(svg), Err(CutoutError::Svg(_))));
    }

    #[test]
    fn test_compact_numbers() {
        let svg = r#"<svg><path d="M.5.5H1.5V1.5H.5Z"/></svg>"#;
        let doc = parse_svg(svg).unwrap();
        assert_eq!(doc.rects, vec![Rect::new(0.5, 0.5, 1.0, 1.0)]);
        assert_eq!(tokenize_d("M.5.5L1e2.5"), vec!["M", ".5", ".5", "L", "1e2", ".5"]);
    }

    #[test]
    fn test_namespaced_elements() {
        let svg = r#"<svg:svg xmlns:svg="http://www.w3.org/2000/svg" width="3in">
            <svg:path d="M0 0 H1 V1 H0 Z"/><svg:rect x="2" y="0" width="1" height="1"/>
            </svg:svg>"#;
        let doc = parse_svg(svg).unwrap();
        assert_eq!(doc.units, "in");
        assert_eq!(
            doc.rects,
            vec![Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(2.0, 0.0, 1.0, 1.0)]
        );
    }

    #[test]
    fn test_comments_and_cdata_skipped() {
        let svg = r#"<?xml version="1.0"?>
            <svg width="1in">
            <!-- a>b <rect x="0" y="0" width="0" height="1"/> -->
            <style><![CDATA[ <rect width="0"/> ]]></style>
            <rect x="1" y="1" width="2" height="2"/>
            </svg>"#;
        let doc = parse_svg(svg).unwrap();
        assert_eq!(doc.rects, vec![Rect::new(1.0, 1.0, 2.0, 2.0)]);
    }

    #[test]
    fn test_malformed_markup() {
        let svg = r#"<svg><path d="M0 0 H1 V1 H0 Z"/></g></svg>"#;
        assert!(matches!(parse_svg(svg), Err(CutoutError::Svg(_))));
    }

    #[test]
    fn test_tokenize_exponent_and_sign() {
        assert_eq!(tokenize_d("M1e-3-2"), vec!["M", "1e-3", "-2"]);
    }
}
