#[cfg(test)]
mod environment_tests {
    use std::rc::Rc;

    use glox::environment::{Environment, SharedEnv};
    use glox::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_define_and_get() {
        let mut env = Environment::new();
        env.define("a", Value::from(1.0));

        assert_eq!(env.get("a", 1).unwrap(), Value::Number(1.0));
        assert!(env.contains("a"));
        assert!(!env.contains("b"));
    }

    #[test]
    fn test_define_overwrites_in_same_frame() {
        let mut env = Environment::new();
        env.define("a", Value::from(1.0));
        env.define("a", Value::from("two"));

        assert_eq!(env.get("a", 1).unwrap(), Value::from("two"));
    }

    #[test]
    fn test_undefined_variable() {
        let env = Environment::new();
        let err = env.get("missing", 3).unwrap_err();

        assert_eq!(
            err.to_string(),
            "[line 3] Runtime error: Undefined variable 'missing'."
        );
    }

    #[test]
    fn test_child_shadows_and_reads_through() {
        let global: SharedEnv = Environment::new_global();
        global.borrow_mut().define("a", Value::from(1.0));
        global.borrow_mut().define("b", Value::from(2.0));

        let child: SharedEnv = Environment::child_of(&global);
        child.borrow_mut().define("a", Value::from("inner"));

        assert_eq!(child.borrow().get("a", 1).unwrap(), Value::from("inner"));
        assert_eq!(child.borrow().get("b", 1).unwrap(), Value::Number(2.0));
        assert_eq!(global.borrow().get("a", 1).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_assign_updates_nearest_binding() {
        let global: SharedEnv = Environment::new_global();
        global.borrow_mut().define("a", Value::from(1.0));

        let child: SharedEnv = Environment::child_of(&global);
        child.borrow_mut().assign("a", Value::from(5.0), 1).unwrap();

        assert!(!child.borrow().contains("a"));
        assert_eq!(global.borrow().get("a", 1).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_assign_never_creates_a_binding() {
        let global: SharedEnv = Environment::new_global();
        let child: SharedEnv = Environment::child_of(&global);

        let err = child.borrow_mut().assign("ghost", Value::Nil, 7).unwrap_err();

        assert_eq!(
            err.to_string(),
            "[line 7] Runtime error: Undefined variable 'ghost'."
        );
        assert!(!global.borrow().contains("ghost"));
    }

    #[test]
    fn test_get_at_and_assign_at_use_exact_distance() {
        let global: SharedEnv = Environment::new_global();
        global.borrow_mut().define("x", Value::from("global"));

        let middle: SharedEnv = Environment::child_of(&global);
        middle.borrow_mut().define("x", Value::from("middle"));

        let inner: SharedEnv = Environment::child_of(&middle);

        assert_eq!(
            Environment::get_at(&inner, 1, "x", 1).unwrap(),
            Value::from("middle")
        );
        assert_eq!(
            Environment::get_at(&inner, 2, "x", 1).unwrap(),
            Value::from("global")
        );

        // No searching: the binding must live exactly there.
        assert!(Environment::get_at(&inner, 0, "x", 1).is_err());

        Environment::assign_at(&inner, 2, "x", Value::from(9.0), 1).unwrap();
        assert_eq!(global.borrow().get("x", 1).unwrap(), Value::Number(9.0));
        assert_eq!(middle.borrow().get("x", 1).unwrap(), Value::from("middle"));

        assert!(Environment::assign_at(&inner, 0, "x", Value::Nil, 1).is_err());
    }

    #[test]
    fn test_ancestor() {
        let global: SharedEnv = Environment::new_global();
        let child: SharedEnv = Environment::child_of(&global);

        let found = Environment::ancestor(&child, 1).unwrap();
        assert!(Rc::ptr_eq(&found, &global));
        assert!(Rc::ptr_eq(&Environment::ancestor(&child, 0).unwrap(), &child));
        assert!(Environment::ancestor(&child, 2).is_none());
        assert!(Environment::get_at(&child, 5, "x", 1).is_err());
    }

    #[test]
    fn test_frames_are_shared_not_copied() {
        let global: SharedEnv = Environment::new_global();
        let frame: SharedEnv = Environment::child_of(&global);
        frame.borrow_mut().define("n", Value::from(0.0));

        // Two holders of the same frame, as two closures would be.
        let first: SharedEnv = Rc::clone(&frame);
        let second: SharedEnv = Rc::clone(&frame);

        first.borrow_mut().assign("n", Value::from(1.0), 1).unwrap();

        assert_eq!(second.borrow().get("n", 1).unwrap(), Value::Number(1.0));
        assert!(Rc::ptr_eq(
            &second.borrow().enclosing().unwrap(),
            &global
        ));
    }
}
