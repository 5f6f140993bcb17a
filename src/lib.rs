pub mod configuration;

pub mod math {
    pub mod curve {
        pub mod curve;
        pub mod segmentfunction;
        pub mod nonparametriccurve {
            pub mod nonparametriccurve;
            pub mod piecewiselinear;
            pub mod lagrangepolynomial;
        }
    }
}

pub mod segment {
    pub mod segment;
    pub mod segmentstore;
}

pub mod stitching {
    pub mod stitcherror;
    pub mod fitresult;
    pub mod offsetfitter;
    pub mod merger;
    pub mod stitcher;
}
