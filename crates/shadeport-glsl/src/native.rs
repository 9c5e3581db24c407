//! Native GLSL forms produced by lowering.
//!
//! Lowering never builds strings directly: it builds one of these values, and text only appears
//! through their `Display` impls. Tests inspect the structured form (for example to evaluate a
//! sampling coordinate) without re-parsing shader text.

use std::fmt;

use crate::vocab::{Expr, ImageFormat};

/// `layout(...) uniform [readonly] <type> <name>`, without the trailing `;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeDeclaration {
    pub binding: Option<u32>,
    pub format: Option<ImageFormat>,
    pub readonly: bool,
    pub type_name: &'static str,
    pub name: String,
}

impl fmt::Display for NativeDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut layout = Vec::with_capacity(2);
        if let Some(binding) = self.binding {
            layout.push(format!("binding = {binding}"));
        }
        if let Some(format) = self.format {
            layout.push(format.native().to_owned());
        }
        if !layout.is_empty() {
            write!(f, "layout({}) ", layout.join(", "))?;
        }
        f.write_str("uniform ")?;
        if self.readonly {
            f.write_str("readonly ")?;
        }
        write!(f, "{} {}", self.type_name, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFunction {
    Texture,
    TextureLod,
    TextureGrad,
    TexelFetch,
}

impl SampleFunction {
    pub fn native(self) -> &'static str {
        match self {
            SampleFunction::Texture => "texture",
            SampleFunction::TextureLod => "textureLod",
            SampleFunction::TextureGrad => "textureGrad",
            SampleFunction::TexelFetch => "texelFetch",
        }
    }
}

/// Coordinate operand of a native sampling call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCoord {
    /// The author's coordinate, unchanged.
    Direct(Expr),
    /// `vecN(base, layer)`: the layer appended as the trailing component.
    WithLayer { components: u8, base: Expr, layer: Expr },
    /// `ivec2(x, y)` integer texel address.
    Texel { x: Expr, y: Expr },
    /// `vec2(0.0, 0.0)`, the fixed read position of the multisample approximation.
    Origin,
}

impl fmt::Display for NativeCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeCoord::Direct(coord) => write!(f, "{coord}"),
            NativeCoord::WithLayer {
                components,
                base,
                layer,
            } => write!(f, "vec{components}({base}, {layer})"),
            NativeCoord::Texel { x, y } => write!(f, "ivec2({x}, {y})"),
            NativeCoord::Origin => f.write_str("vec2(0.0, 0.0)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSample {
    pub function: SampleFunction,
    pub texture: String,
    pub coord: NativeCoord,
    /// LOD, gradients or sample index, passed through in order.
    pub trailing: Vec<Expr>,
}

impl NativeSample {
    /// True for the single-sample stand-in used where multisample reads are unavailable.
    pub fn is_approximation(&self) -> bool {
        self.coord == NativeCoord::Origin
    }
}

impl fmt::Display for NativeSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {}", self.function.native(), self.texture, self.coord)?;
        for arg in &self.trailing {
            write!(f, ", {arg}")?;
        }
        f.write_str(")")
    }
}

/// Plain native function call, optionally wrapped in parentheses so it behaves as one operand
/// wherever it is substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCall {
    pub function: &'static str,
    pub args: Vec<String>,
    pub grouped: bool,
}

impl fmt::Display for NativeCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.grouped {
            f.write_str("(")?;
        }
        write!(f, "{}({})", self.function, self.args.join(", "))?;
        if self.grouped {
            f.write_str(")")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeMatrix {
    /// `matN(args)`; the native constructor consumes its vector arguments as columns.
    /// `transpose` wraps the result so the arguments act as rows instead.
    Construct {
        size: u8,
        args: Vec<Expr>,
        transpose: bool,
    },
    /// `m[0] = c0; m[1] = c1; ...` column-by-column assignment.
    ColumnAssign { target: Expr, columns: Vec<Expr> },
    /// `((lhs) * (rhs))`
    Product { lhs: Expr, rhs: Expr },
    Passthrough(Expr),
}

impl fmt::Display for NativeMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeMatrix::Construct {
                size,
                args,
                transpose,
            } => {
                let args: Vec<&str> = args.iter().map(Expr::as_str).collect();
                if *transpose {
                    write!(f, "transpose(mat{size}({}))", args.join(", "))
                } else {
                    write!(f, "mat{size}({})", args.join(", "))
                }
            }
            NativeMatrix::ColumnAssign { target, columns } => {
                for (i, column) in columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{target}[{i}] = {column};")?;
                }
                Ok(())
            }
            NativeMatrix::Product { lhs, rhs } => write!(f, "(({lhs}) * ({rhs}))"),
            NativeMatrix::Passthrough(expr) => write!(f, "{expr}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeClip {
    Passthrough(Expr),
    /// `(d * 0.5 + 0.5)` as a value.
    AffineDepth(Expr),
    /// `(d = d * 0.5 + 0.5)`, remapping the lvalue in place.
    AssignAffineDepth(Expr),
    /// `vec2(r.x, r.y)`
    NdcXy(Expr),
    Builtin(&'static str),
}

impl fmt::Display for NativeClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeClip::Passthrough(expr) => write!(f, "{expr}"),
            NativeClip::AffineDepth(expr) => write!(f, "({} * 0.5 + 0.5)", expr.grouped()),
            NativeClip::AssignAffineDepth(target) => {
                let target = target.as_str().trim();
                write!(f, "({target} = {target} * 0.5 + 0.5)")
            }
            NativeClip::NdcXy(ray) => {
                let ray = ray.grouped();
                write!(f, "vec2({ray}.x, {ray}.y)")
            }
            NativeClip::Builtin(name) => f.write_str(name),
        }
    }
}

/// Lowered form of any vocabulary operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Native {
    Declaration(NativeDeclaration),
    Sample(NativeSample),
    Call(NativeCall),
    Matrix(NativeMatrix),
    Clip(NativeClip),
    Token(&'static str),
}

impl Native {
    pub fn is_approximation(&self) -> bool {
        matches!(self, Native::Sample(sample) if sample.is_approximation())
    }
}

impl fmt::Display for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Native::Declaration(decl) => fmt::Display::fmt(decl, f),
            Native::Sample(sample) => fmt::Display::fmt(sample, f),
            Native::Call(call) => fmt::Display::fmt(call, f),
            Native::Matrix(matrix) => fmt::Display::fmt(matrix, f),
            Native::Clip(clip) => fmt::Display::fmt(clip, f),
            Native::Token(token) => f.write_str(token),
        }
    }
}
