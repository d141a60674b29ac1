macro_rules! import_models {
    ($x:ident) => {
        mod $x;
        pub use self::$x::*;
    };
}

import_models!(ids);
import_models!(build_farm_job);
import_models!(build);
import_models!(build_queue);
import_models!(builder);
