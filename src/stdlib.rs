//! Embedded standard library.
//!
//! The minimal `java.lang` / `java.io` every Joos program depends on,
//! compiled through the normal pipeline ahead of the user's units. The
//! sources are deliberately plain Joos: whatever the compiler accepts from
//! users it must also accept here.

/// `(simple name, source)` pairs, in compilation (and therefore static
/// initialization) order.
pub const SOURCES: &[(&str, &str)] = &[
    ("Object", OBJECT),
    ("String", STRING),
    ("Cloneable", CLONEABLE),
    ("Serializable", SERIALIZABLE),
    ("OutputStream", OUTPUT_STREAM),
    ("System", SYSTEM),
];

const OBJECT: &str = r#"
package java.lang;

public class Object {
    public Object() {}

    public boolean equals(Object other) {
        return this == other;
    }

    public String toString() {
        return "";
    }

    public int hashCode() {
        return 0;
    }
}
"#;

const STRING: &str = r#"
package java.lang;

public class String {
    public char[] chars;

    public String() {
        chars = new char[0];
    }

    public String(char[] value) {
        chars = new char[value.length];
        for (int i = 0; i < value.length; i = i + 1) {
            chars[i] = value[i];
        }
    }

    public int length() {
        return chars.length;
    }

    public char charAt(int index) {
        return chars[index];
    }

    public String concat(String other) {
        char[] combined = new char[chars.length + other.chars.length];
        for (int i = 0; i < chars.length; i = i + 1) {
            combined[i] = chars[i];
        }
        for (int j = 0; j < other.chars.length; j = j + 1) {
            combined[chars.length + j] = other.chars[j];
        }
        return new String(combined);
    }

    public boolean equals(Object other) {
        if (!(other instanceof String)) {
            return false;
        }
        String s = (String) other;
        if (s.length() != length()) {
            return false;
        }
        for (int i = 0; i < length(); i = i + 1) {
            if (charAt(i) != s.charAt(i)) {
                return false;
            }
        }
        return true;
    }

    public int hashCode() {
        int h = 0;
        for (int i = 0; i < chars.length; i = i + 1) {
            h = h * 31 + chars[i];
        }
        return h;
    }

    public String toString() {
        return this;
    }

    public static String valueOf(char c) {
        char[] one = new char[1];
        one[0] = c;
        return new String(one);
    }

    public static String valueOf(boolean b) {
        if (b) {
            return "true";
        }
        return "false";
    }

    public static String valueOf(int i) {
        if (i == -2147483648) {
            return "-2147483648";
        }
        if (i < 0) {
            return "-".concat(String.valueOf(-i));
        }
        if (i < 10) {
            char[] one = new char[1];
            one[0] = (char) (48 + i);
            return new String(one);
        }
        return String.valueOf(i / 10).concat(String.valueOf(i % 10));
    }

    public static String valueOf(Object o) {
        if (o == null) {
            return "null";
        }
        return o.toString();
    }
}
"#;

const CLONEABLE: &str = r#"
package java.lang;

public interface Cloneable {
}
"#;

const SERIALIZABLE: &str = r#"
package java.io;

public interface Serializable {
}
"#;

const OUTPUT_STREAM: &str = r#"
package java.io;

public class OutputStream {
    public OutputStream() {}

    public static native int nativeWrite(int b);

    public void write(int b) {
        OutputStream.nativeWrite(b);
    }

    public void print(String s) {
        String actual = s;
        if (actual == null) {
            actual = "null";
        }
        for (int i = 0; i < actual.length(); i = i + 1) {
            OutputStream.nativeWrite(actual.charAt(i));
        }
    }

    public void println(String s) {
        print(s);
        OutputStream.nativeWrite(10);
    }

    public void print(int i) {
        print(String.valueOf(i));
    }

    public void println(int i) {
        println(String.valueOf(i));
    }
}
"#;

const SYSTEM: &str = r#"
package java.lang;

import java.io.OutputStream;

public class System {
    public static OutputStream out = new OutputStream();

    public System() {}
}
"#;
