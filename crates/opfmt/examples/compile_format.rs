//! Compile a small operation's assembly format and show the rendered Rust
//! parser/printer pair.
//!
//! ```text
//! cargo run --example compile_format
//! ```

use opfmt::backend::source;
use opfmt::schema::{AttrDecl, OpTrait, Operation, ValueDecl};

fn main() {
    let op = Operation::new("demo.select")
        .operand(ValueDecl::single("condition").with_buildable_type("i1"))
        .operand(ValueDecl::single("true_value"))
        .operand(ValueDecl::single("false_value"))
        .result(ValueDecl::single("result"))
        .attribute(AttrDecl::new("fast").unit())
        .with_trait(OpTrait::AllTypesMatch {
            values: vec![
                "true_value".into(),
                "false_value".into(),
                "result".into(),
            ],
        });

    let format =
        "$condition `,` $true_value `,` $false_value (`fast` $fast^)? attr-dict `:` type($result)";

    match opfmt::compile(&op, format) {
        Ok(compiled) => {
            println!("// parse program: {} steps", compiled.parse.steps.len());
            println!("// print program: {} steps", compiled.print.steps.len());
            println!();
            match source::render_pretty(&op, &compiled) {
                Ok(rendered) => println!("{rendered}"),
                Err(err) => eprintln!("renderer produced invalid Rust: {err}"),
            }
        }
        Err(err) => {
            for diag in &err.diagnostics {
                eprintln!("{diag}");
            }
            std::process::exit(1);
        }
    }
}
