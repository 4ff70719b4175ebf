//! System.Math native methods.

use interpreter::{Class, TypeReference, Value, VirtualMachine};

use crate::support::{arg_f64, native};

/// Register `System.Math`.
pub fn register(vm: &mut VirtualMachine) {
    let math = Class::new_ref("Math");
    math.set_namespace("System");
    math.set_abstract(true);

    // Constants are exposed as nullary methods.
    math.add_method(native("PI", TypeReference::float64(), true, &[], |_, _, _| {
        Ok(Value::Float64(std::f64::consts::PI))
    }));
    math.add_method(native("E", TypeReference::float64(), true, &[], |_, _, _| {
        Ok(Value::Float64(std::f64::consts::E))
    }));
    math.add_method(native("Tau", TypeReference::float64(), true, &[], |_, _, _| {
        Ok(Value::Float64(std::f64::consts::TAU))
    }));

    let unary: &[(&str, fn(f64) -> f64)] = &[
        ("Sin", f64::sin),
        ("Cos", f64::cos),
        ("Tan", f64::tan),
        ("Asin", f64::asin),
        ("Acos", f64::acos),
        ("Atan", f64::atan),
        ("Sinh", f64::sinh),
        ("Cosh", f64::cosh),
        ("Tanh", f64::tanh),
        ("Exp", f64::exp),
        ("Log10", f64::log10),
        ("Sqrt", f64::sqrt),
        ("Floor", f64::floor),
        ("Ceiling", f64::ceil),
        ("Truncate", f64::trunc),
        ("Abs", f64::abs),
    ];
    for (name, op) in unary {
        let op = *op;
        math.add_method(native(
            name,
            TypeReference::float64(),
            true,
            &[("value", TypeReference::float64())],
            move |_, args, _| Ok(Value::Float64(op(arg_f64(args, 0)?))),
        ));
    }

    // Log has a natural-log form and a chosen-base form.
    math.add_method(native(
        "Log",
        TypeReference::float64(),
        true,
        &[("value", TypeReference::float64())],
        |_, args, _| Ok(Value::Float64(arg_f64(args, 0)?.ln())),
    ));
    math.add_method(native(
        "Log",
        TypeReference::float64(),
        true,
        &[
            ("value", TypeReference::float64()),
            ("newBase", TypeReference::float64()),
        ],
        |_, args, _| Ok(Value::Float64(arg_f64(args, 0)?.log(arg_f64(args, 1)?))),
    ));

    math.add_method(native(
        "Pow",
        TypeReference::float64(),
        true,
        &[("x", TypeReference::float64()), ("y", TypeReference::float64())],
        |_, args, _| Ok(Value::Float64(arg_f64(args, 0)?.powf(arg_f64(args, 1)?))),
    ));
    math.add_method(native(
        "Atan2",
        TypeReference::float64(),
        true,
        &[("y", TypeReference::float64()), ("x", TypeReference::float64())],
        |_, args, _| Ok(Value::Float64(arg_f64(args, 0)?.atan2(arg_f64(args, 1)?))),
    ));

    math.add_method(native(
        "Round",
        TypeReference::float64(),
        true,
        &[("value", TypeReference::float64())],
        |_, args, _| Ok(Value::Float64(round_half_even(arg_f64(args, 0)?, 0))),
    ));
    math.add_method(native(
        "Round",
        TypeReference::float64(),
        true,
        &[
            ("value", TypeReference::float64()),
            ("digits", TypeReference::int32()),
        ],
        |_, args, _| {
            let digits = crate::support::arg_i64(args, 1)?.clamp(0, 15) as i32;
            Ok(Value::Float64(round_half_even(arg_f64(args, 0)?, digits)))
        },
    ));

    math.add_method(native(
        "Sign",
        TypeReference::int32(),
        true,
        &[("value", TypeReference::float64())],
        |_, args, _| {
            let value = arg_f64(args, 0)?;
            Ok(Value::Int32(if value > 0.0 {
                1
            } else if value < 0.0 {
                -1
            } else {
                0
            }))
        },
    ));
    math.add_method(native(
        "Min",
        TypeReference::float64(),
        true,
        &[
            ("val1", TypeReference::float64()),
            ("val2", TypeReference::float64()),
        ],
        |_, args, _| Ok(Value::Float64(arg_f64(args, 0)?.min(arg_f64(args, 1)?))),
    ));
    math.add_method(native(
        "Max",
        TypeReference::float64(),
        true,
        &[
            ("val1", TypeReference::float64()),
            ("val2", TypeReference::float64()),
        ],
        |_, args, _| Ok(Value::Float64(arg_f64(args, 0)?.max(arg_f64(args, 1)?))),
    ));

    vm.register_class(math);
}

/// Banker's rounding to `digits` decimal places, matching CLR Math.Round.
fn round_half_even(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    let scaled = value * scale;
    let floor = scaled.floor();
    let fraction = scaled - floor;
    let rounded = if (fraction - 0.5).abs() < f64::EPSILON {
        if (floor as i64) % 2 == 0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        scaled.round()
    };
    rounded / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn math_vm() -> VirtualMachine {
        let mut vm = VirtualMachine::new();
        register(&mut vm);
        vm
    }

    #[test]
    fn test_sqrt_and_pow() {
        let mut vm = math_vm();
        assert_eq!(
            vm.invoke_static_by_name("System.Math", "Sqrt", &[Value::Float64(9.0)])
                .unwrap(),
            Value::Float64(3.0)
        );
        assert_eq!(
            vm.invoke_static_by_name("Math", "Pow", &[Value::Float64(2.0), Value::Float64(10.0)])
                .unwrap(),
            Value::Float64(1024.0)
        );
    }

    #[test]
    fn test_constants() {
        let mut vm = math_vm();
        assert_eq!(
            vm.invoke_static_by_name("Math", "PI", &[]).unwrap(),
            Value::Float64(std::f64::consts::PI)
        );
        assert_eq!(
            vm.invoke_static_by_name("Math", "Tau", &[]).unwrap(),
            Value::Float64(std::f64::consts::TAU)
        );
    }

    #[test]
    fn test_numeric_arguments_widen() {
        let mut vm = math_vm();
        // int32 arguments widen to float64 on the way in.
        assert_eq!(
            vm.invoke_static_by_name("Math", "Abs", &[Value::Int32(-5)]).unwrap(),
            Value::Float64(5.0)
        );
    }

    #[test]
    fn test_sign() {
        let mut vm = math_vm();
        assert_eq!(
            vm.invoke_static_by_name("Math", "Sign", &[Value::Float64(-2.5)])
                .unwrap(),
            Value::Int32(-1)
        );
        assert_eq!(
            vm.invoke_static_by_name("Math", "Sign", &[Value::Float64(0.0)])
                .unwrap(),
            Value::Int32(0)
        );
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(2.5, 0), 2.0);
        assert_eq!(round_half_even(3.5, 0), 4.0);
        assert_eq!(round_half_even(2.4, 0), 2.0);
        assert_eq!(round_half_even(2.25, 1), 2.2);
    }
}
