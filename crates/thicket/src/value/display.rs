//! Display and Debug implementations for Value
//!
//! `Display` is the human `str` form; [`Printer`] with `readable` set is the
//! `pr-str` form that the reader parses back.

use std::fmt::{self, Write};

use super::*;

/// Hook for custom types that override `toString`.
pub trait CustomPrinter {
    /// Render `instance`, or `None` to use the default tagged-map form.
    fn print_custom(&self, instance: &CustomInstance) -> Option<String>;
}

/// Value printer.
pub struct Printer<'a> {
    readable: bool,
    hook: Option<&'a dyn CustomPrinter>,
}

impl<'a> Printer<'a> {
    /// Human-readable form (strings unquoted).
    pub fn plain() -> Self {
        Self {
            readable: false,
            hook: None,
        }
    }

    /// Readable form (strings quoted and escaped, decimals marked).
    pub fn readable() -> Self {
        Self {
            readable: true,
            hook: None,
        }
    }

    /// Consult `hook` for custom type instances.
    pub fn with_hook(mut self, hook: &'a dyn CustomPrinter) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Render a value to a string.
    pub fn print(&self, value: &Value) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = self.write(&mut out, value);
        out
    }

    fn write_seq<'v>(
        &self,
        out: &mut String,
        open: &str,
        items: impl Iterator<Item = &'v Value>,
        close: &str,
    ) -> fmt::Result {
        out.push_str(open);
        for (i, item) in items.enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.write(out, item)?;
        }
        out.push_str(close);
        Ok(())
    }

    fn write_entries<'v>(
        &self,
        out: &mut String,
        entries: impl Iterator<Item = (&'v Value, &'v Value)>,
    ) -> fmt::Result {
        out.push('{');
        for (i, (k, v)) in entries.enumerate() {
            if i > 0 {
                out.push(' ');
            }
            self.write(out, k)?;
            out.push(' ');
            self.write(out, v)?;
        }
        out.push('}');
        Ok(())
    }

    fn write(&self, out: &mut String, value: &Value) -> fmt::Result {
        match value {
            Value::Nil => out.push_str("nil"),
            Value::Bool(b) => write!(out, "{}", b)?,
            Value::Integer(n) => write!(out, "{}", n)?,
            Value::Float(f) => write_float(out, *f)?,
            Value::Decimal(d) if self.readable => write!(out, "{}M", d)?,
            Value::Decimal(d) => write!(out, "{}", d)?,
            Value::String(s) if self.readable => write_escaped(out, s),
            Value::String(s) => out.push_str(s),
            Value::Keyword(k) => write!(out, "{}", k)?,
            Value::Symbol(s) => write!(out, "{}", s)?,
            Value::List(items, _) => self.write_seq(out, "(", items.iter(), ")")?,
            Value::Vector(items, _) => self.write_seq(out, "[", items.iter(), "]")?,
            Value::Set(set, _) => self.write_seq(out, "#{", set.iter(), "}")?,
            Value::Map(map, _) => self.write_entries(out, map.iter())?,
            Value::Function(Function::Native(n)) => write!(out, "#<native {}>", n.name)?,
            Value::Function(f) => write!(out, "#<fn {}>", f.name())?,
            Value::Macro(m) => write!(out, "#<macro {}>", m.display_name())?,
            Value::Atom(a) => {
                out.push_str("#<atom ");
                self.write(out, &a.get())?;
                out.push('>');
            }
            Value::Future(p) => {
                let state = if p.is_realized() { "realized" } else { "pending" };
                write!(out, "#<future {}>", state)?;
            }
            Value::Custom(c) => {
                if let Some(text) = self.hook.and_then(|h| h.print_custom(c)) {
                    out.push_str(&text);
                } else {
                    write!(out, "#{}", c.tag())?;
                    self.write_entries(out, c.fields.iter())?;
                }
            }
            Value::Handle(h) => write!(out, "#<handle {}>", h.type_name())?,
        }
        Ok(())
    }
}

fn write_float(out: &mut String, f: f64) -> fmt::Result {
    if f.is_nan() {
        out.push_str("##NaN");
        Ok(())
    } else if f.is_infinite() {
        out.push_str(if f > 0.0 { "##Inf" } else { "##-Inf" });
        Ok(())
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        write!(out, "{:.1}", f)
    } else {
        write!(out, "{:?}", f)
    }
}

fn write_escaped(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

impl Value {
    /// The readable (`pr-str`) rendering.
    pub fn pr_str(&self) -> String {
        Printer::readable().print(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Printer::plain().print(self))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Printer::readable().print(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_readable_strings() {
        let v = Value::string("a \"b\"\n");
        assert_eq!(v.to_string(), "a \"b\"\n");
        assert_eq!(v.pr_str(), r#""a \"b\"\n""#);
    }

    #[test]
    fn test_float_always_has_fraction() {
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
    }

    #[test]
    fn test_non_finite_floats_print_readably() {
        assert_eq!(Value::Float(f64::INFINITY).pr_str(), "##Inf");
        assert_eq!(Value::Float(f64::NEG_INFINITY).pr_str(), "##-Inf");
        assert_eq!(Value::Float(f64::NAN).pr_str(), "##NaN");
        let back = crate::reader::read_one("[##Inf ##-Inf]", "t").unwrap();
        assert_eq!(back.pr_str(), "[##Inf ##-Inf]");
    }

    #[test]
    fn test_collections() {
        let v = Value::vector(vec![
            Value::Integer(1),
            Value::list(vec![Value::keyword("a"), Value::Nil]),
        ]);
        assert_eq!(v.pr_str(), "[1 (:a nil)]");
        let m = Value::map_from([(Value::keyword("k"), Value::string("v"))]);
        assert_eq!(m.pr_str(), r#"{:k "v"}"#);
    }

    #[test]
    fn test_decimal_marker_only_when_readable() {
        let d = Value::Decimal(Decimal::parse("1.50").unwrap());
        assert_eq!(d.to_string(), "1.50");
        assert_eq!(d.pr_str(), "1.50M");
    }

    #[test]
    fn test_handle_prints_type_name() {
        let h = Value::handle(7u8);
        assert_eq!(h.to_string(), "#<handle u8>");
    }
}
