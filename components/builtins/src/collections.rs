//! System.Collections.Generic native classes.
//!
//! Each collection keeps its storage as native data attached to the
//! receiver object by its `.ctor`; the element type parameters in the class
//! names (`List`1`, `Dictionary`2`, ...) are not enforced, matching the
//! advisory typing of the rest of the engine.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use core_types::{ErrorKind, RuntimeError, RuntimeResult};
use interpreter::{Array, Class, ObjectRef, TypeReference, Value, VirtualMachine};

use crate::support::{arg, arg_i64, native, receiver};

type ListData = RefCell<Vec<Value>>;
type DictData = RefCell<HashMap<Value, Value>>;
type StackData = RefCell<Vec<Value>>;
type QueueData = RefCell<VecDeque<Value>>;
type SetData = RefCell<HashSet<Value>>;

fn storage<T: 'static>(this: Option<&ObjectRef>, what: &str) -> RuntimeResult<Rc<T>> {
    let object = receiver(this)?;
    object.borrow().native_data::<T>().ok_or_else(|| {
        RuntimeError::new(
            ErrorKind::NoInstance,
            format!("{what} has no storage; construct it with .ctor"),
        )
    })
}

/// Register the `System.Collections.Generic` classes.
pub fn register(vm: &mut VirtualMachine) {
    register_list(vm);
    register_dictionary(vm);
    register_stack(vm);
    register_queue(vm);
    register_hash_set(vm);
}

fn collection_class(raw_name: &str) -> interpreter::ClassRef {
    let class = Class::new_ref(raw_name);
    class.set_namespace("System.Collections.Generic");
    class
}

fn register_list(vm: &mut VirtualMachine) {
    let list = collection_class("System.Collections.Generic.List`1");

    list.add_method(native(".ctor", TypeReference::void(), false, &[], |this, _, _| {
        let object = receiver(this)?;
        object
            .borrow_mut()
            .set_native_data(Rc::new(ListData::new(Vec::new())));
        Ok(Value::Null)
    }));
    list.add_method(native(
        ".ctor",
        TypeReference::void(),
        false,
        &[("capacity", TypeReference::int32())],
        |this, args, _| {
            let capacity = arg_i64(args, 0)?.max(0) as usize;
            let object = receiver(this)?;
            object
                .borrow_mut()
                .set_native_data(Rc::new(ListData::new(Vec::with_capacity(capacity))));
            Ok(Value::Null)
        },
    ));

    list.add_method(native("get_Count", TypeReference::int32(), false, &[], |this, _, _| {
        let data = storage::<ListData>(this, "List")?;
        let len = data.borrow().len();
        Ok(Value::Int32(len as i32))
    }));

    list.add_method(native(
        "get_Item",
        TypeReference::object(),
        false,
        &[("index", TypeReference::int32())],
        |this, args, _| {
            let data = storage::<ListData>(this, "List")?;
            let index = arg_i64(args, 0)?;
            let items = data.borrow();
            if index < 0 || index as usize >= items.len() {
                return Err(RuntimeError::new(
                    ErrorKind::OutOfRange,
                    format!("list index {index} out of range"),
                ));
            }
            Ok(items[index as usize].clone())
        },
    ));
    list.add_method(native(
        "set_Item",
        TypeReference::void(),
        false,
        &[
            ("index", TypeReference::int32()),
            ("value", TypeReference::object()),
        ],
        |this, args, _| {
            let data = storage::<ListData>(this, "List")?;
            let index = arg_i64(args, 0)?;
            let value = arg(args, 1)?.clone();
            let mut items = data.borrow_mut();
            let slot = if index >= 0 {
                items.get_mut(index as usize)
            } else {
                None
            };
            match slot {
                Some(slot) => {
                    *slot = value;
                    Ok(Value::Null)
                }
                None => Err(RuntimeError::new(
                    ErrorKind::OutOfRange,
                    format!("list index {index} out of range"),
                )),
            }
        },
    ));

    list.add_method(native(
        "Add",
        TypeReference::void(),
        false,
        &[("item", TypeReference::object())],
        |this, args, _| {
            let data = storage::<ListData>(this, "List")?;
            data.borrow_mut().push(arg(args, 0)?.clone());
            Ok(Value::Null)
        },
    ));
    list.add_method(native(
        "Insert",
        TypeReference::void(),
        false,
        &[
            ("index", TypeReference::int32()),
            ("item", TypeReference::object()),
        ],
        |this, args, _| {
            let data = storage::<ListData>(this, "List")?;
            let index = arg_i64(args, 0)?;
            let mut items = data.borrow_mut();
            if index < 0 || index as usize > items.len() {
                return Err(RuntimeError::new(
                    ErrorKind::OutOfRange,
                    format!("insert index {index} out of range"),
                ));
            }
            items.insert(index as usize, arg(args, 1)?.clone());
            Ok(Value::Null)
        },
    ));
    list.add_method(native(
        "RemoveAt",
        TypeReference::void(),
        false,
        &[("index", TypeReference::int32())],
        |this, args, _| {
            let data = storage::<ListData>(this, "List")?;
            let index = arg_i64(args, 0)?;
            let mut items = data.borrow_mut();
            if index < 0 || index as usize >= items.len() {
                return Err(RuntimeError::new(
                    ErrorKind::OutOfRange,
                    format!("remove index {index} out of range"),
                ));
            }
            items.remove(index as usize);
            Ok(Value::Null)
        },
    ));
    list.add_method(native(
        "Remove",
        TypeReference::bool(),
        false,
        &[("item", TypeReference::object())],
        |this, args, _| {
            let data = storage::<ListData>(this, "List")?;
            let needle = arg(args, 0)?;
            let mut items = data.borrow_mut();
            match items.iter().position(|v| v == needle) {
                Some(index) => {
                    items.remove(index);
                    Ok(Value::Boolean(true))
                }
                None => Ok(Value::Boolean(false)),
            }
        },
    ));
    list.add_method(native("Clear", TypeReference::void(), false, &[], |this, _, _| {
        let data = storage::<ListData>(this, "List")?;
        data.borrow_mut().clear();
        Ok(Value::Null)
    }));
    list.add_method(native(
        "Contains",
        TypeReference::bool(),
        false,
        &[("item", TypeReference::object())],
        |this, args, _| {
            let data = storage::<ListData>(this, "List")?;
            let needle = arg(args, 0)?;
            let found = data.borrow().iter().any(|v| v == needle);
            Ok(Value::Boolean(found))
        },
    ));
    list.add_method(native(
        "IndexOf",
        TypeReference::int32(),
        false,
        &[("item", TypeReference::object())],
        |this, args, _| {
            let data = storage::<ListData>(this, "List")?;
            let needle = arg(args, 0)?;
            let index = data
                .borrow()
                .iter()
                .position(|v| v == needle)
                .map(|i| i as i32)
                .unwrap_or(-1);
            Ok(Value::Int32(index))
        },
    ));
    list.add_method(native("ToArray", TypeReference::object(), false, &[], |this, _, _| {
        let data = storage::<ListData>(this, "List")?;
        let items = data.borrow();
        let mut array = Array::new(TypeReference::object(), items.len() as i32);
        for (index, value) in items.iter().enumerate() {
            array.set(index as i32, value.clone());
        }
        Ok(Value::Object(array.into_object()))
    }));

    vm.register_class(list);
}

fn register_dictionary(vm: &mut VirtualMachine) {
    let dictionary = collection_class("System.Collections.Generic.Dictionary`2");

    dictionary.add_method(native(".ctor", TypeReference::void(), false, &[], |this, _, _| {
        let object = receiver(this)?;
        object
            .borrow_mut()
            .set_native_data(Rc::new(DictData::new(HashMap::new())));
        Ok(Value::Null)
    }));
    dictionary.add_method(native(
        "get_Count",
        TypeReference::int32(),
        false,
        &[],
        |this, _, _| {
            let data = storage::<DictData>(this, "Dictionary")?;
            let len = data.borrow().len();
            Ok(Value::Int32(len as i32))
        },
    ));
    dictionary.add_method(native(
        "get_Item",
        TypeReference::object(),
        false,
        &[("key", TypeReference::object())],
        |this, args, _| {
            let data = storage::<DictData>(this, "Dictionary")?;
            let key = arg(args, 0)?;
            let value = data.borrow().get(key).cloned();
            value.ok_or_else(|| {
                RuntimeError::new(ErrorKind::FieldNotFound, format!("key not found: {key}"))
            })
        },
    ));
    dictionary.add_method(native(
        "set_Item",
        TypeReference::void(),
        false,
        &[
            ("key", TypeReference::object()),
            ("value", TypeReference::object()),
        ],
        |this, args, _| {
            let data = storage::<DictData>(this, "Dictionary")?;
            data.borrow_mut()
                .insert(arg(args, 0)?.clone(), arg(args, 1)?.clone());
            Ok(Value::Null)
        },
    ));
    dictionary.add_method(native(
        "ContainsKey",
        TypeReference::bool(),
        false,
        &[("key", TypeReference::object())],
        |this, args, _| {
            let data = storage::<DictData>(this, "Dictionary")?;
            let found = data.borrow().contains_key(arg(args, 0)?);
            Ok(Value::Boolean(found))
        },
    ));
    dictionary.add_method(native(
        "Remove",
        TypeReference::bool(),
        false,
        &[("key", TypeReference::object())],
        |this, args, _| {
            let data = storage::<DictData>(this, "Dictionary")?;
            let removed = data.borrow_mut().remove(arg(args, 0)?).is_some();
            Ok(Value::Boolean(removed))
        },
    ));
    dictionary.add_method(native("Clear", TypeReference::void(), false, &[], |this, _, _| {
        let data = storage::<DictData>(this, "Dictionary")?;
        data.borrow_mut().clear();
        Ok(Value::Null)
    }));

    vm.register_class(dictionary);
}

fn register_stack(vm: &mut VirtualMachine) {
    let stack = collection_class("System.Collections.Generic.Stack`1");

    stack.add_method(native(".ctor", TypeReference::void(), false, &[], |this, _, _| {
        let object = receiver(this)?;
        object
            .borrow_mut()
            .set_native_data(Rc::new(StackData::new(Vec::new())));
        Ok(Value::Null)
    }));
    stack.add_method(native(
        "get_Count",
        TypeReference::int32(),
        false,
        &[],
        |this, _, _| {
            let data = storage::<StackData>(this, "Stack")?;
            let len = data.borrow().len();
            Ok(Value::Int32(len as i32))
        },
    ));
    stack.add_method(native(
        "Push",
        TypeReference::void(),
        false,
        &[("item", TypeReference::object())],
        |this, args, _| {
            let data = storage::<StackData>(this, "Stack")?;
            data.borrow_mut().push(arg(args, 0)?.clone());
            Ok(Value::Null)
        },
    ));
    stack.add_method(native("Pop", TypeReference::object(), false, &[], |this, _, _| {
        let data = storage::<StackData>(this, "Stack")?;
        let popped = data.borrow_mut().pop();
        popped.ok_or_else(|| {
            RuntimeError::new(ErrorKind::StackUnderflow, "pop on an empty Stack")
        })
    }));
    stack.add_method(native("Peek", TypeReference::object(), false, &[], |this, _, _| {
        let data = storage::<StackData>(this, "Stack")?;
        let top = data.borrow().last().cloned();
        top.ok_or_else(|| {
            RuntimeError::new(ErrorKind::StackUnderflow, "peek on an empty Stack")
        })
    }));
    stack.add_method(native("Clear", TypeReference::void(), false, &[], |this, _, _| {
        let data = storage::<StackData>(this, "Stack")?;
        data.borrow_mut().clear();
        Ok(Value::Null)
    }));
    stack.add_method(native(
        "Contains",
        TypeReference::bool(),
        false,
        &[("item", TypeReference::object())],
        |this, args, _| {
            let data = storage::<StackData>(this, "Stack")?;
            let needle = arg(args, 0)?;
            let found = data.borrow().iter().any(|v| v == needle);
            Ok(Value::Boolean(found))
        },
    ));

    vm.register_class(stack);
}

fn register_queue(vm: &mut VirtualMachine) {
    let queue = collection_class("System.Collections.Generic.Queue`1");

    queue.add_method(native(".ctor", TypeReference::void(), false, &[], |this, _, _| {
        let object = receiver(this)?;
        object
            .borrow_mut()
            .set_native_data(Rc::new(QueueData::new(VecDeque::new())));
        Ok(Value::Null)
    }));
    queue.add_method(native(
        "get_Count",
        TypeReference::int32(),
        false,
        &[],
        |this, _, _| {
            let data = storage::<QueueData>(this, "Queue")?;
            let len = data.borrow().len();
            Ok(Value::Int32(len as i32))
        },
    ));
    queue.add_method(native(
        "Enqueue",
        TypeReference::void(),
        false,
        &[("item", TypeReference::object())],
        |this, args, _| {
            let data = storage::<QueueData>(this, "Queue")?;
            data.borrow_mut().push_back(arg(args, 0)?.clone());
            Ok(Value::Null)
        },
    ));
    queue.add_method(native("Dequeue", TypeReference::object(), false, &[], |this, _, _| {
        let data = storage::<QueueData>(this, "Queue")?;
        let popped = data.borrow_mut().pop_front();
        popped.ok_or_else(|| {
            RuntimeError::new(ErrorKind::StackUnderflow, "dequeue on an empty Queue")
        })
    }));
    queue.add_method(native("Peek", TypeReference::object(), false, &[], |this, _, _| {
        let data = storage::<QueueData>(this, "Queue")?;
        let front = data.borrow().front().cloned();
        front.ok_or_else(|| {
            RuntimeError::new(ErrorKind::StackUnderflow, "peek on an empty Queue")
        })
    }));
    queue.add_method(native("Clear", TypeReference::void(), false, &[], |this, _, _| {
        let data = storage::<QueueData>(this, "Queue")?;
        data.borrow_mut().clear();
        Ok(Value::Null)
    }));
    queue.add_method(native(
        "Contains",
        TypeReference::bool(),
        false,
        &[("item", TypeReference::object())],
        |this, args, _| {
            let data = storage::<QueueData>(this, "Queue")?;
            let needle = arg(args, 0)?;
            let found = data.borrow().iter().any(|v| v == needle);
            Ok(Value::Boolean(found))
        },
    ));

    vm.register_class(queue);
}

fn register_hash_set(vm: &mut VirtualMachine) {
    let hash_set = collection_class("System.Collections.Generic.HashSet`1");

    hash_set.add_method(native(".ctor", TypeReference::void(), false, &[], |this, _, _| {
        let object = receiver(this)?;
        object
            .borrow_mut()
            .set_native_data(Rc::new(SetData::new(HashSet::new())));
        Ok(Value::Null)
    }));
    hash_set.add_method(native(
        "get_Count",
        TypeReference::int32(),
        false,
        &[],
        |this, _, _| {
            let data = storage::<SetData>(this, "HashSet")?;
            let len = data.borrow().len();
            Ok(Value::Int32(len as i32))
        },
    ));
    hash_set.add_method(native(
        "Add",
        TypeReference::bool(),
        false,
        &[("item", TypeReference::object())],
        |this, args, _| {
            let data = storage::<SetData>(this, "HashSet")?;
            let inserted = data.borrow_mut().insert(arg(args, 0)?.clone());
            Ok(Value::Boolean(inserted))
        },
    ));
    hash_set.add_method(native(
        "Remove",
        TypeReference::bool(),
        false,
        &[("item", TypeReference::object())],
        |this, args, _| {
            let data = storage::<SetData>(this, "HashSet")?;
            let removed = data.borrow_mut().remove(arg(args, 0)?);
            Ok(Value::Boolean(removed))
        },
    ));
    hash_set.add_method(native(
        "Contains",
        TypeReference::bool(),
        false,
        &[("item", TypeReference::object())],
        |this, args, _| {
            let data = storage::<SetData>(this, "HashSet")?;
            let found = data.borrow().contains(arg(args, 0)?);
            Ok(Value::Boolean(found))
        },
    ));
    hash_set.add_method(native("Clear", TypeReference::void(), false, &[], |this, _, _| {
        let data = storage::<SetData>(this, "HashSet")?;
        data.borrow_mut().clear();
        Ok(Value::Null)
    }));

    vm.register_class(hash_set);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(vm: &mut VirtualMachine, class_name: &str) -> ObjectRef {
        let object = vm.create_object(class_name).unwrap();
        vm.invoke_instance_by_name(&object, ".ctor", &[]).unwrap();
        object
    }

    fn collections_vm() -> VirtualMachine {
        let mut vm = VirtualMachine::new();
        register(&mut vm);
        vm
    }

    #[test]
    fn test_list_add_get_remove() {
        let mut vm = collections_vm();
        let list = collection(&mut vm, "List`1");

        vm.invoke_instance_by_name(&list, "Add", &[Value::Int32(1)]).unwrap();
        vm.invoke_instance_by_name(&list, "Add", &[Value::Int32(2)]).unwrap();
        assert_eq!(
            vm.invoke_instance_by_name(&list, "get_Count", &[]).unwrap(),
            Value::Int32(2)
        );
        assert_eq!(
            vm.invoke_instance_by_name(&list, "get_Item", &[Value::Int32(1)]).unwrap(),
            Value::Int32(2)
        );
        assert_eq!(
            vm.invoke_instance_by_name(&list, "IndexOf", &[Value::Int32(2)]).unwrap(),
            Value::Int32(1)
        );
        assert_eq!(
            vm.invoke_instance_by_name(&list, "Remove", &[Value::Int32(1)]).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            vm.invoke_instance_by_name(&list, "get_Count", &[]).unwrap(),
            Value::Int32(1)
        );
    }

    #[test]
    fn test_list_index_out_of_range() {
        let mut vm = collections_vm();
        let list = collection(&mut vm, "List`1");
        let err = vm
            .invoke_instance_by_name(&list, "get_Item", &[Value::Int32(0)])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfRange);
    }

    #[test]
    fn test_list_to_array() {
        let mut vm = collections_vm();
        let list = collection(&mut vm, "List`1");
        vm.invoke_instance_by_name(&list, "Add", &[Value::Int32(7)]).unwrap();

        let result = vm.invoke_instance_by_name(&list, "ToArray", &[]).unwrap();
        let object = result.as_object().unwrap();
        let array = Array::from_object(&object).unwrap();
        assert_eq!(array.borrow().len(), 1);
        assert_eq!(array.borrow().get(0), Value::Int32(7));
    }

    #[test]
    fn test_uninitialized_collection_fails() {
        let mut vm = collections_vm();
        let list = vm.create_object("List`1").unwrap();
        let err = vm.invoke_instance_by_name(&list, "get_Count", &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoInstance);
    }

    #[test]
    fn test_dictionary_keys_mix_value_types() {
        let mut vm = collections_vm();
        let dict = collection(&mut vm, "Dictionary`2");

        vm.invoke_instance_by_name(
            &dict,
            "set_Item",
            &[Value::String("k".to_string()), Value::Int32(1)],
        )
        .unwrap();
        vm.invoke_instance_by_name(&dict, "set_Item", &[Value::Int32(5), Value::Int32(2)])
            .unwrap();

        assert_eq!(
            vm.invoke_instance_by_name(&dict, "get_Item", &[Value::String("k".to_string())])
                .unwrap(),
            Value::Int32(1)
        );
        assert_eq!(
            vm.invoke_instance_by_name(&dict, "ContainsKey", &[Value::Int32(5)]).unwrap(),
            Value::Boolean(true)
        );
        // No promotion: an int64 key is distinct from the int32 key.
        assert_eq!(
            vm.invoke_instance_by_name(&dict, "ContainsKey", &[Value::Int64(5)]).unwrap(),
            Value::Boolean(false)
        );

        let err = vm
            .invoke_instance_by_name(&dict, "get_Item", &[Value::String("absent".to_string())])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::FieldNotFound);
    }

    #[test]
    fn test_stack_lifo_and_underflow() {
        let mut vm = collections_vm();
        let stack = collection(&mut vm, "Stack`1");

        vm.invoke_instance_by_name(&stack, "Push", &[Value::Int32(1)]).unwrap();
        vm.invoke_instance_by_name(&stack, "Push", &[Value::Int32(2)]).unwrap();
        assert_eq!(
            vm.invoke_instance_by_name(&stack, "Peek", &[]).unwrap(),
            Value::Int32(2)
        );
        assert_eq!(
            vm.invoke_instance_by_name(&stack, "Pop", &[]).unwrap(),
            Value::Int32(2)
        );
        assert_eq!(
            vm.invoke_instance_by_name(&stack, "Pop", &[]).unwrap(),
            Value::Int32(1)
        );
        let err = vm.invoke_instance_by_name(&stack, "Pop", &[]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackUnderflow);
    }

    #[test]
    fn test_queue_fifo() {
        let mut vm = collections_vm();
        let queue = collection(&mut vm, "Queue`1");

        vm.invoke_instance_by_name(&queue, "Enqueue", &[Value::Int32(1)]).unwrap();
        vm.invoke_instance_by_name(&queue, "Enqueue", &[Value::Int32(2)]).unwrap();
        assert_eq!(
            vm.invoke_instance_by_name(&queue, "Dequeue", &[]).unwrap(),
            Value::Int32(1)
        );
        assert_eq!(
            vm.invoke_instance_by_name(&queue, "Dequeue", &[]).unwrap(),
            Value::Int32(2)
        );
    }

    #[test]
    fn test_hash_set_deduplicates() {
        let mut vm = collections_vm();
        let set = collection(&mut vm, "HashSet`1");

        assert_eq!(
            vm.invoke_instance_by_name(&set, "Add", &[Value::String("a".to_string())])
                .unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            vm.invoke_instance_by_name(&set, "Add", &[Value::String("a".to_string())])
                .unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            vm.invoke_instance_by_name(&set, "get_Count", &[]).unwrap(),
            Value::Int32(1)
        );
    }
}
