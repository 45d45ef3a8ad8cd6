//! Compact source-syntax rendering of types for reason messages.

use semvet_types::{ChanDir, SignatureShape, TypeData, TypeGraph, TypeId};

const MAX_DEPTH: u32 = 4;

/// Render a type the way the source language writes it. Composite bodies
/// collapse to `{…}` past the first level, and a depth bound keeps cyclic
/// graphs printable.
pub fn render(graph: &TypeGraph, t: TypeId) -> String {
    render_depth(graph, t, 0)
}

fn render_depth(graph: &TypeGraph, t: TypeId, depth: u32) -> String {
    if depth > MAX_DEPTH {
        return "…".to_owned();
    }
    match *graph.data(t) {
        TypeData::Basic(kind) => kind.name().to_owned(),
        TypeData::Named(nid) => {
            let decl = graph.named_decl(nid);
            if decl.pkg_path.is_empty() {
                decl.name.clone()
            } else {
                format!("{}.{}", decl.pkg_path, decl.name)
            }
        }
        TypeData::TypeParam(pid) => graph.type_param_decl(pid).name.clone(),
        TypeData::Pointer(elem) => format!("*{}", render_depth(graph, elem, depth + 1)),
        TypeData::Slice(elem) => format!("[]{}", render_depth(graph, elem, depth + 1)),
        TypeData::Array { len, elem } => {
            format!("[{len}]{}", render_depth(graph, elem, depth + 1))
        }
        TypeData::Map { key, value } => format!(
            "map[{}]{}",
            render_depth(graph, key, depth + 1),
            render_depth(graph, value, depth + 1)
        ),
        TypeData::Chan { dir, elem } => {
            let elem = render_depth(graph, elem, depth + 1);
            match dir {
                ChanDir::SendRecv => format!("chan {elem}"),
                ChanDir::SendOnly => format!("chan<- {elem}"),
                ChanDir::RecvOnly => format!("<-chan {elem}"),
            }
        }
        TypeData::Signature(sid) => {
            format!("func{}", render_signature(graph, graph.signature_shape(sid), depth))
        }
        TypeData::Struct(sid) => {
            if depth >= 1 {
                return "struct{…}".to_owned();
            }
            let fields: Vec<String> = graph
                .struct_shape(sid)
                .fields
                .iter()
                .map(|f| {
                    let ty = render_depth(graph, f.ty, depth + 1);
                    if f.embedded {
                        ty
                    } else {
                        format!("{} {}", f.name, ty)
                    }
                })
                .collect();
            format!("struct{{{}}}", fields.join("; "))
        }
        TypeData::Interface(iid) => {
            if depth >= 1 {
                return "interface{…}".to_owned();
            }
            let shape = graph.interface_shape(iid);
            let mut parts: Vec<String> = Vec::new();
            if shape.comparable {
                parts.push("comparable".to_owned());
            }
            for emb in &shape.embeddeds {
                parts.push(render_depth(graph, *emb, depth + 1));
            }
            for m in &shape.methods {
                let sig = match *graph.data(m.sig) {
                    TypeData::Signature(sid) => {
                        render_signature(graph, graph.signature_shape(sid), depth)
                    }
                    _ => "()".to_owned(),
                };
                parts.push(format!("{}{}", m.name, sig));
            }
            format!("interface{{{}}}", parts.join("; "))
        }
        TypeData::Union(uid) => {
            let terms: Vec<String> = graph
                .union_shape(uid)
                .terms
                .iter()
                .map(|term| {
                    let ty = render_depth(graph, term.ty, depth + 1);
                    if term.tilde { format!("~{ty}") } else { ty }
                })
                .collect();
            terms.join(" | ")
        }
    }
}

/// The `(params) results` part of a signature, shared between function
/// types and interface method lines.
fn render_signature(graph: &TypeGraph, shape: &SignatureShape, depth: u32) -> String {
    let n = shape.params.len();
    let params: Vec<String> = shape
        .params
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            if shape.variadic && i + 1 == n {
                // The last parameter of a variadic signature carries a
                // slice type; print it back in `...T` form.
                if let TypeData::Slice(elem) = *graph.data(p) {
                    return format!("...{}", render_depth(graph, elem, depth + 1));
                }
            }
            render_depth(graph, p, depth + 1)
        })
        .collect();
    let params = format!("({})", params.join(", "));
    match shape.results.len() {
        0 => params,
        1 => format!(
            "{params} {}",
            render_depth(graph, shape.results[0], depth + 1)
        ),
        _ => {
            let results: Vec<String> = shape
                .results
                .iter()
                .map(|&r| render_depth(graph, r, depth + 1))
                .collect();
            format!("{params} ({})", results.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semvet_types::{BasicKind, Field, SignatureShape};

    #[test]
    fn renders_composites() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let string = g.basic(BasicKind::String);

        let slice = g.slice(int);
        assert_eq!(render(&g, slice), "[]int");

        let arr = g.array(7, int);
        assert_eq!(render(&g, arr), "[7]int");

        let m = g.map_of(string, slice);
        assert_eq!(render(&g, m), "map[string][]int");

        let ptr = g.pointer(int);
        assert_eq!(render(&g, ptr), "*int");

        let send = g.chan_of(ChanDir::SendOnly, int);
        assert_eq!(render(&g, send), "chan<- int");

        let recv = g.chan_of(ChanDir::RecvOnly, int);
        assert_eq!(render(&g, recv), "<-chan int");
    }

    #[test]
    fn renders_named_with_package() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let t = g.named("Count", "example.com/m/pkg");
        g.set_underlying(t, int);
        assert_eq!(render(&g, t), "example.com/m/pkg.Count");
    }

    #[test]
    fn renders_signatures() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let string = g.basic(BasicKind::String);
        let opts = g.slice(string);

        let sig = g.signature(SignatureShape {
            type_params: Vec::new(),
            params: vec![int, opts],
            results: vec![g.error_type()],
            variadic: true,
        });
        assert_eq!(render(&g, sig), "func(int, ...string) error");

        let sig2 = g.signature(SignatureShape {
            type_params: Vec::new(),
            params: vec![int],
            results: vec![int, g.error_type()],
            variadic: false,
        });
        assert_eq!(render(&g, sig2), "func(int) (int, error)");
    }

    #[test]
    fn renders_struct_one_level() {
        let mut g = TypeGraph::new();
        let int = g.basic(BasicKind::Int);
        let inner = g.strukt(vec![Field {
            name: "X".to_owned(),
            ty: int,
            tag: String::new(),
            embedded: false,
            pkg_path: "p".to_owned(),
        }]);
        let outer = g.strukt(vec![Field {
            name: "Inner".to_owned(),
            ty: inner,
            tag: String::new(),
            embedded: false,
            pkg_path: "p".to_owned(),
        }]);
        assert_eq!(render(&g, outer), "struct{Inner struct{…}}");
    }

    #[test]
    fn render_terminates_on_cycles() {
        let mut g = TypeGraph::new();
        let node = g.named("Node", "p");
        let ptr = g.pointer(node);
        let slice = g.slice(ptr);
        let shape = g.strukt(vec![Field {
            name: "Children".to_owned(),
            ty: slice,
            tag: String::new(),
            embedded: false,
            pkg_path: "p".to_owned(),
        }]);
        g.set_underlying(node, shape);
        // Named types render by name, so the cycle never unrolls.
        assert_eq!(render(&g, shape), "struct{Children []*p.Node}");
    }
}
