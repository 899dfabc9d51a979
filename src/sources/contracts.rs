//! Solidity interfaces read by the dashboard.

use alloy::sol;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IMasterChefV2 {
        function poolLength() external view returns (uint256);
        function poolInfo(uint256 pid) external view returns (
            uint256 accCakePerShare,
            uint256 lastRewardBlock,
            uint256 allocPoint,
            uint256 totalBoostedShare,
            bool isRegular
        );
        function lpToken(uint256 pid) external view returns (address);
        function totalSpecialAllocPoint() external view returns (uint256);
        function cakePerBlock(bool isRegular) external view returns (uint256);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IPancakePair {
        function token0() external view returns (address);
        function token1() external view returns (address);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20 {
        function symbol() external view returns (string);
        function balanceOf(address account) external view returns (uint256);
        function totalSupply() external view returns (uint256);
    }

    // Pre-standard tokens (MKR and friends) return the symbol as bytes32.
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20Bytes32 {
        function symbol() external view returns (bytes32);
    }
}
