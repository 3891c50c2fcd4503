use std::str::FromStr;

use knuffel::errors::DecodeError;
use miette::miette;

/// RGBA colour with unpremultiplied components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new_unpremul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8_unpremul(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new_unpremul(
            f32::from(r) / 255.,
            f32::from(g) / 255.,
            f32::from(b) / 255.,
            f32::from(a) / 255.,
        )
    }

    pub fn to_array_unpremul(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Packs the colour into a premultiplied `0xAARRGGBB` pixel.
    pub fn to_argb32_premul(self) -> u32 {
        let a = self.a.clamp(0., 1.);
        let channel = |c: f32| ((c.clamp(0., 1.) * a) * 255.).round() as u32;
        let alpha = (a * 255.).round() as u32;
        (alpha << 24) | (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }
}

impl FromStr for Color {
    type Err = miette::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let color = csscolorparser::parse(s).map_err(|err| miette!("invalid color {s:?}: {err}"))?;
        let [r, g, b, a] = color.to_array();
        Ok(Self::new_unpremul(r as f32, g as f32, b as f32, a as f32))
    }
}

impl<S: knuffel::traits::ErrorSpan> knuffel::DecodeScalar<S> for Color {
    fn type_check(
        type_name: &Option<knuffel::span::Spanned<knuffel::ast::TypeName, S>>,
        ctx: &mut knuffel::decode::Context<S>,
    ) {
        if let Some(type_name) = &type_name {
            ctx.emit_error(DecodeError::unexpected(
                type_name,
                "type name",
                "no type name expected for this node",
            ));
        }
    }

    fn raw_decode(
        val: &knuffel::span::Spanned<knuffel::ast::Literal, S>,
        ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<Color, DecodeError<S>> {
        match &**val {
            knuffel::ast::Literal::String(ref s) => match s.parse::<Color>() {
                Ok(color) => Ok(color),
                Err(err) => {
                    ctx.emit_error(DecodeError::conversion(val, err));
                    Ok(Color::from_rgba8_unpremul(255, 0, 255, 255))
                }
            },
            _ => {
                ctx.emit_error(DecodeError::unsupported(
                    val,
                    "colors must be given as CSS color strings",
                ));
                Ok(Color::from_rgba8_unpremul(255, 0, 255, 255))
            }
        }
    }
}

/// Reports an error for anything on `node` other than child nodes.
pub fn expect_only_children<S>(
    node: &knuffel::ast::SpannedNode<S>,
    ctx: &mut knuffel::decode::Context<S>,
) where
    S: knuffel::traits::ErrorSpan,
{
    if let Some(type_name) = &node.type_name {
        ctx.emit_error(DecodeError::unexpected(
            type_name,
            "type name",
            "no type name expected for this node",
        ));
    }

    for val in node.arguments.iter() {
        ctx.emit_error(DecodeError::unexpected(
            &val.literal,
            "argument",
            "no arguments expected for this node",
        ));
    }

    for name in node.properties.keys() {
        ctx.emit_error(DecodeError::unexpected(
            name,
            "property",
            "no properties expected for this node",
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_color() {
        let color = "#ff000080".parse::<Color>().unwrap();
        assert_eq!(color.r, 1.);
        assert_eq!(color.g, 0.);
        assert!((color.a - 128. / 255.).abs() < 1e-3);
    }

    #[test]
    fn premultiplied_packing() {
        let color = Color::from_rgba8_unpremul(255, 255, 255, 255);
        assert_eq!(color.to_argb32_premul(), 0xffff_ffff);

        let half = Color::new_unpremul(1., 0., 0., 0.5);
        assert_eq!(half.to_argb32_premul(), 0x8080_0000);
    }

    #[test]
    fn rejects_garbage() {
        assert!("definitely-not-a-color".parse::<Color>().is_err());
    }
}
